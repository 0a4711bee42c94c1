#![forbid(unsafe_code)]

pub mod archive;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod formats;
pub mod logging;
pub mod naming;
pub mod page;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod staging;

use std::path::Path;

use anyhow::Context as _;
use dialoguer::{Confirm, Input};

/// Asked when the catalog directory already exists and the policy is `ask`.
pub trait OverwritePrompt {
    fn confirm_overwrite(&self, dir: &Path) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl OverwritePrompt for TerminalPrompt {
    fn confirm_overwrite(&self, dir: &Path) -> anyhow::Result<bool> {
        Confirm::new()
            .with_prompt(format!(
                "Directory already exists: {}. Overwrite?",
                dir.display()
            ))
            .default(true)
            .interact()
            .context("read overwrite confirmation")
    }
}

/// Fixed answer, for non-interactive callers and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl OverwritePrompt for FixedAnswer {
    fn confirm_overwrite(&self, _dir: &Path) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}

pub fn ask_catalog_url() -> anyhow::Result<String> {
    let url: String = Input::new()
        .with_prompt("Enter the URL of the manga you want to download")
        .allow_empty(true)
        .interact_text()
        .context("read catalog url")?;
    Ok(url.trim().to_owned())
}

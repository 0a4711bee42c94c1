use std::io::IsTerminal as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::cli::{CompressionMode, OverwriteMode, RunArgs};
use crate::fetch::PlausibilityPolicy;

/// Everything a run needs, decided before the first request is made.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub catalog_url: Url,
    pub manga_root: PathBuf,
    pub overwrite: OverwriteMode,
    pub save_catalog_dump: bool,
    pub min_key_width: usize,
    pub default_extension: String,
    pub plausibility: PlausibilityPolicy,
    pub page_timeout: Duration,
    pub image_timeout: Duration,
    pub politeness_delay: Duration,
    pub settle_delay: Duration,
    pub compression: CompressionMode,
    pub user_agent: String,
    pub show_progress: bool,
}

impl PipelineConfig {
    /// Builds a config with the command line defaults for everything but the
    /// catalog URL and the root directory.
    pub fn new(catalog_url: &str, manga_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Ok(Self {
            catalog_url: parse_catalog_url(catalog_url)?,
            manga_root: manga_root.into(),
            overwrite: OverwriteMode::Ask,
            save_catalog_dump: false,
            min_key_width: 3,
            default_extension: "jpg".to_owned(),
            plausibility: PlausibilityPolicy::default(),
            page_timeout: Duration::from_secs(10),
            image_timeout: Duration::from_secs(30),
            politeness_delay: Duration::from_millis(50),
            settle_delay: Duration::from_millis(300),
            compression: CompressionMode::Stored,
            user_agent: concat!("mangapack/", env!("CARGO_PKG_VERSION")).to_owned(),
            show_progress: false,
        })
    }

    /// `catalog_url` is passed separately because it may come from a prompt.
    pub fn from_args(args: &RunArgs, catalog_url: &str) -> anyhow::Result<Self> {
        let manga_root = match args.manga_root.as_deref() {
            Some(root) => PathBuf::from(root),
            None => default_manga_root()?,
        };

        let default_extension = args.default_extension.trim().trim_start_matches('.');
        if default_extension.is_empty() {
            anyhow::bail!("--default-extension must not be empty");
        }

        Ok(Self {
            catalog_url: parse_catalog_url(catalog_url)?,
            manga_root,
            overwrite: args.overwrite,
            save_catalog_dump: args.dump_catalog,
            min_key_width: args.min_key_width.max(1),
            default_extension: default_extension.to_owned(),
            plausibility: PlausibilityPolicy {
                min_bytes: args.min_image_bytes,
                require_image_content_type: args.require_image_content_type,
            },
            page_timeout: Duration::from_secs(args.page_timeout_secs),
            image_timeout: Duration::from_secs(args.image_timeout_secs),
            politeness_delay: Duration::from_millis(args.delay_ms),
            settle_delay: Duration::from_millis(args.settle_ms),
            compression: args.compression,
            user_agent: args.user_agent.clone(),
            show_progress: !args.no_progress && std::io::stderr().is_terminal(),
        })
    }
}

pub fn default_manga_root() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("determine home directory for default --manga-root")?;
    Ok(home.join("Manga"))
}

/// Only absolute http(s) URLs are accepted; anything else halts the run.
pub fn parse_catalog_url(input: &str) -> anyhow::Result<Url> {
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("catalog url must not be empty");
    }
    if !(input.starts_with("http://") || input.starts_with("https://")) {
        anyhow::bail!("catalog url must start with http:// or https://: {input}");
    }

    let url = Url::parse(input).with_context(|| format!("parse catalog url: {input}"))?;
    if url.host_str().is_none() {
        anyhow::bail!("catalog url must have a host: {input}");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_catalog_url_accepts_http_and_https() -> anyhow::Result<()> {
        assert_eq!(
            parse_catalog_url(" https://manga.in.ua/mangas/105-tokiiskyi-gul.html ")?.as_str(),
            "https://manga.in.ua/mangas/105-tokiiskyi-gul.html"
        );
        assert_eq!(parse_catalog_url("http://127.0.0.1:8080/a")?.port(), Some(8080));
        Ok(())
    }

    #[test]
    fn parse_catalog_url_rejects_other_input() {
        assert!(parse_catalog_url("").is_err());
        assert!(parse_catalog_url("   ").is_err());
        assert!(parse_catalog_url("ftp://example.com/a").is_err());
        assert!(parse_catalog_url("example.com/manga.html").is_err());
        assert!(parse_catalog_url("https://").is_err());
    }

    #[test]
    fn no_progress_flag_hides_progress_bars() -> anyhow::Result<()> {
        use clap::Parser as _;

        let cli = crate::cli::Cli::parse_from([
            "mangapack",
            "run",
            "--manga-root",
            "/tmp/manga",
            "--no-progress",
        ]);
        let crate::cli::Command::Run(args) = cli.command else {
            anyhow::bail!("expected run command");
        };
        let config = PipelineConfig::from_args(&args, "https://example.com/a.html")?;
        assert!(!config.show_progress);
        assert_eq!(config.manga_root, PathBuf::from("/tmp/manga"));
        Ok(())
    }
}

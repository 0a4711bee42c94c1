use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use crate::catalog::decimal_digits;

/// Raw result of one image request, before any plausibility checks.
#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub trait ImageSource {
    fn get(&self, url: &str) -> anyhow::Result<ImageResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: reqwest::blocking::Client,
}

impl HttpImageSource {
    pub fn new(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("build image http client")?;
        Ok(Self { client })
    }
}

impl ImageSource for HttpImageSource {
    fn get(&self, url: &str) -> anyhow::Result<ImageResponse> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "image/avif,image/webp,image/*,*/*;q=0.8")
            .send()
            .with_context(|| format!("GET {url}"))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .bytes()
            .with_context(|| format!("read body of {url}"))?
            .to_vec();

        Ok(ImageResponse {
            status,
            content_type,
            bytes,
        })
    }
}

/// Rules that separate a real image from an error page served with 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlausibilityPolicy {
    /// Bodies of this size or smaller are rejected.
    pub min_bytes: usize,
    pub require_image_content_type: bool,
}

impl Default for PlausibilityPolicy {
    fn default() -> Self {
        Self {
            min_bytes: 1024,
            require_image_content_type: false,
        }
    }
}

impl PlausibilityPolicy {
    pub fn check(&self, response: &ImageResponse) -> Result<(), SkipReason> {
        if !(200..300).contains(&response.status) {
            return Err(SkipReason::Status(response.status));
        }
        if self.require_image_content_type {
            let content_type = response.content_type.as_deref().unwrap_or_default();
            if !content_type.trim().to_ascii_lowercase().starts_with("image/") {
                return Err(SkipReason::NotAnImage(content_type.to_owned()));
            }
        }
        if response.bytes.len() <= self.min_bytes {
            return Err(SkipReason::TooSmall {
                len: response.bytes.len(),
                min: self.min_bytes,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("content type {0:?} is not an image")]
    NotAnImage(String),
    #[error("body of {len} bytes is not above the {min} byte minimum")]
    TooSmall { len: usize, min: usize },
    #[error("write failed: {0}")]
    Write(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Saved { position: usize, path: PathBuf },
    Skipped { position: usize, url: String, reason: SkipReason },
}

/// Per-chapter result of [`fetch_chapter_images`], one outcome per input URL.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub outcomes: Vec<ImageOutcome>,
}

impl FetchReport {
    pub fn saved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ImageOutcome::Saved { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.saved()
    }
}

/// Downloads `urls` one by one into `staging_dir`.
///
/// Files are numbered by a running count of successful downloads, so the
/// staging directory never has gaps; a failed image is logged and skipped.
pub fn fetch_chapter_images(
    source: &dyn ImageSource,
    urls: &[String],
    staging_dir: &Path,
    default_extension: &str,
    policy: &PlausibilityPolicy,
) -> anyhow::Result<FetchReport> {
    std::fs::create_dir_all(staging_dir)
        .with_context(|| format!("create staging dir: {}", staging_dir.display()))?;

    let width = page_name_width(urls.len());
    let mut report = FetchReport {
        outcomes: Vec::with_capacity(urls.len()),
    };
    let mut next_page = 0_usize;

    for (position, url) in urls.iter().enumerate() {
        let extension = image_extension(url, default_extension);
        let path = staging_dir.join(format!("{next_page:0width$}.{extension}"));

        let outcome = match download_to(source, url, &path, policy) {
            Ok(()) => {
                tracing::debug!(position, %url, path = %path.display(), "saved image");
                next_page += 1;
                ImageOutcome::Saved { position, path }
            }
            Err(reason) => {
                tracing::warn!(position, %url, %reason, "skipping image");
                ImageOutcome::Skipped {
                    position,
                    url: url.clone(),
                    reason,
                }
            }
        };
        report.outcomes.push(outcome);
    }

    Ok(report)
}

fn download_to(
    source: &dyn ImageSource,
    url: &str,
    path: &Path,
    policy: &PlausibilityPolicy,
) -> Result<(), SkipReason> {
    let response = source
        .get(url)
        .map_err(|err| SkipReason::Request(format!("{err:#}")))?;
    policy.check(&response)?;
    std::fs::write(path, &response.bytes)
        .map_err(|err| SkipReason::Write(format!("{}: {err}", path.display())))
}

/// At least two digits, more when the chapter has over a hundred images.
pub fn page_name_width(image_count: usize) -> usize {
    decimal_digits(image_count.saturating_sub(1)).max(2)
}

/// Suffix after the last `.` of the URL's final path segment, or `default`.
pub fn image_extension(url: &str, default: &str) -> String {
    let last_segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_owned(),
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or_default();
            path.rsplit('/').next().unwrap_or_default().to_owned()
        }
    };

    match last_segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            ext.to_owned()
        }
        _ => default.to_owned(),
    }
}

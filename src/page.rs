use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Something that can turn a URL into a queryable document.
///
/// Each call hands out an owned [`Page`]; dropping it releases whatever the
/// backend holds for that page (a tab, a socket, a parsed tree).
pub trait PageSource {
    fn open(&self, url: &Url) -> anyhow::Result<Page>;
}

/// A loaded document plus the URL it was served from.
#[derive(Debug)]
pub struct Page {
    url: Url,
    document: Html,
}

impl Page {
    pub fn from_html(url: Url, html: &str) -> Self {
        Self {
            url,
            document: Html::parse_document(html),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whitespace-normalized text of the first match.
    pub fn text(&self, selector: &str) -> anyhow::Result<Option<String>> {
        let selector = parse_selector(selector)?;
        Ok(self
            .document
            .select(&selector)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty()))
    }

    /// For every element matching `outer_selector` (document order), picks the
    /// first or last match of `inner_selector` inside it and maps it with `inner`.
    pub fn select_within<T>(
        &self,
        outer_selector: &str,
        inner_selector: &str,
        pick: Pick,
        mut inner: impl FnMut(ElementRef<'_>) -> Option<T>,
    ) -> anyhow::Result<Vec<T>> {
        let outer = parse_selector(outer_selector)?;
        let inner_sel = parse_selector(inner_selector)?;

        let mut out = Vec::new();
        for element in self.document.select(&outer) {
            let mut matches = element.select(&inner_sel);
            let picked = match pick {
                Pick::First => matches.next(),
                Pick::Last => matches.last(),
            };
            if let Some(value) = picked.and_then(&mut inner) {
                out.push(value);
            }
        }
        Ok(out)
    }

    /// Resolves a possibly relative link against the page URL.
    pub fn resolve(&self, href: &str) -> anyhow::Result<Url> {
        self.url
            .join(href.trim())
            .with_context(|| format!("resolve link {href:?} against {}", self.url))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    First,
    Last,
}

pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_selector(selector: &str) -> anyhow::Result<Selector> {
    Selector::parse(selector).map_err(|err| anyhow::anyhow!("parse selector {selector:?}: {err:?}"))
}

/// Loads pages over plain HTTP. Works for sites that ship their markup
/// server-side; a JavaScript-rendering backend can implement [`PageSource`]
/// in its place.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: reqwest::blocking::Client,
}

impl HttpPageSource {
    pub fn new(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build page http client")?;
        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    fn open(&self, url: &Url) -> anyhow::Result<Page> {
        tracing::debug!(%url, "open page");
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url}: unexpected status {status}");
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            let content_type = content_type.to_ascii_lowercase();
            if !(content_type.starts_with("text/html")
                || content_type.starts_with("application/xhtml+xml"))
            {
                anyhow::bail!("GET {url}: not an html page ({content_type})");
            }
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .with_context(|| format!("read body of {url}"))?;
        Ok(Page::from_html(final_url, &html))
    }
}

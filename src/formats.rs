use serde::Serialize;

use crate::catalog::Catalog;

/// On-disk shape of the optional `{stem}.json` catalog dump.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogDump<'a> {
    pub source_url: String,
    pub scraped_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertised_chapter_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub catalog: &'a Catalog,
}

impl<'a> CatalogDump<'a> {
    pub fn new(source_url: &url::Url, catalog: &'a Catalog) -> Self {
        Self {
            source_url: source_url.to_string(),
            scraped_at: chrono::Utc::now().to_rfc3339(),
            advertised_chapter_count: None,
            description: None,
            catalog,
        }
    }
}

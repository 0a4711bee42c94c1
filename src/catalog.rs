use serde::Serialize;
use serde::ser::SerializeMap as _;

/// One scraped chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterRecord {
    pub index: usize,
    #[serde(rename = "name")]
    pub display_name: Option<String>,
    #[serde(rename = "url")]
    pub source_url: String,
    /// On-page order; this order becomes the page order of the archive.
    pub images: Vec<String>,
}

impl ChapterRecord {
    pub fn new(index: usize, source_url: impl Into<String>) -> Self {
        Self {
            index,
            display_name: None,
            source_url: source_url.into(),
            images: Vec::new(),
        }
    }

    /// Falls back to a 1-based label when the page did not provide a name.
    pub fn label(&self) -> String {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => format!("Chapter {}", self.index + 1),
        }
    }
}

/// Ordered chapter list keyed by zero-padded index.
///
/// The key width is fixed when the catalog is created, so the lexicographic
/// order of keys is the numeric order of indices.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    title: String,
    #[serde(skip)]
    key_width: usize,
    #[serde(serialize_with = "serialize_chapters")]
    chapters: Vec<(String, ChapterRecord)>,
}

impl Catalog {
    /// `chapter_count` is the number of chapters the catalog will hold; the
    /// key width grows past `min_key_width` to fit it.
    pub fn new(title: impl Into<String>, chapter_count: usize, min_key_width: usize) -> Self {
        Self {
            title: title.into(),
            key_width: key_width_for(chapter_count, min_key_width),
            chapters: Vec::with_capacity(chapter_count),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn key_width(&self) -> usize {
        self.key_width
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn key_for(&self, index: usize) -> anyhow::Result<String> {
        chapter_key(index, self.key_width)
    }

    /// Inserts `record` at the key for `index`, replacing any record already there.
    /// A replaced record keeps its original position.
    pub fn add_chapter(&mut self, index: usize, mut record: ChapterRecord) -> anyhow::Result<&str> {
        let key = self.key_for(index)?;
        record.index = index;

        let position = match self.chapters.iter().position(|(k, _)| *k == key) {
            Some(position) => {
                self.chapters[position].1 = record;
                position
            }
            None => {
                self.chapters.push((key, record));
                self.chapters.len() - 1
            }
        };

        Ok(self.chapters[position].0.as_str())
    }

    /// Entries in insertion order.
    pub fn chapters(&self) -> impl Iterator<Item = (&str, &ChapterRecord)> {
        self.chapters
            .iter()
            .map(|(key, record)| (key.as_str(), record))
    }
}

/// Number of decimal digits needed to write `n`.
pub fn decimal_digits(n: usize) -> usize {
    let mut digits = 1;
    let mut rest = n / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    digits
}

/// Smallest width `>= min_width` that holds `chapter_count` (i.e. `ceil(log10(count + 1))`).
pub fn key_width_for(chapter_count: usize, min_width: usize) -> usize {
    decimal_digits(chapter_count).max(min_width).max(1)
}

pub fn chapter_key(index: usize, width: usize) -> anyhow::Result<String> {
    let key = format!("{index:0width$}");
    if key.len() > width {
        anyhow::bail!("chapter index {index} does not fit a {width}-digit chapter key");
    }
    Ok(key)
}

fn serialize_chapters<S>(
    chapters: &[(String, ChapterRecord)],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let mut map = serializer.serialize_map(Some(chapters.len()))?;
    for (key, record) in chapters {
        map.serialize_entry(key, record)?;
    }
    map.end()
}

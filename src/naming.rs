use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static VOLUME_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)tom-(\d+)").unwrap_or_else(|err| panic!("volume marker regex: {err}"))
});

static LEADING_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+-").unwrap_or_else(|err| panic!("leading id regex: {err}"))
});

pub const FALLBACK_VOLUME: &str = "01";

/// Longest file name, in bytes, that ext4, APFS and NTFS all accept.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// A volume tag is parsed as `u64`, so it never has more digits than this.
const MAX_VOLUME_DIGITS: usize = 20;

/// Two-digit volume tag from a `tom-<digits>` marker, or `"01"` when there is none.
pub fn volume_tag(source_url: &str) -> String {
    VOLUME_MARKER
        .captures(source_url)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse::<u64>().ok())
        .map(|volume| format!("{volume:02}"))
        .unwrap_or_else(|| FALLBACK_VOLUME.to_owned())
}

/// `"{title} c{chapter_key} (v{volume})"`; `title` must already be sanitized.
pub fn chapter_file_name(title: &str, chapter_key: &str, source_url: &str) -> String {
    format!("{title} c{chapter_key} (v{})", volume_tag(source_url))
}

/// Makes `raw` usable as a single path segment on every mainstream filesystem.
///
/// Path separators and characters reserved on Windows are dropped, control
/// characters become spaces, runs of whitespace collapse, and trailing dots
/// are removed. Returns `None` when nothing usable is left.
pub fn sanitize_title(raw: &str) -> Option<String> {
    let replaced = raw
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_end_matches(['.', ' ']).trim();

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return None;
    }
    Some(trimmed.to_owned())
}

/// Shortens a sanitized title so that every `"{title} c{key} (v{volume}).zip"`
/// built with `key_width`-digit keys stays within [`MAX_FILE_NAME_BYTES`].
///
/// The cut lands on a char boundary. Returns `None` when no title fits.
pub fn fit_title(title: &str, key_width: usize) -> Option<String> {
    let suffix_len = " c".len() + key_width + " (v".len() + MAX_VOLUME_DIGITS + ").zip".len();
    let budget = MAX_FILE_NAME_BYTES.checked_sub(suffix_len)?;
    if title.len() <= budget {
        return Some(title.to_owned());
    }

    let mut end = budget;
    while !title.is_char_boundary(end) {
        end -= 1;
    }
    sanitize_title(&title[..end])
}

/// File stem for the catalog dump: last path segment without `.html` and
/// without the numeric site id prefix (`105-tokiiskyi-gul.html` -> `tokiiskyi-gul`).
pub fn dump_stem_from_url(url: &Url) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .unwrap_or_default();
    let without_ext = last.strip_suffix(".html").unwrap_or(last);
    let without_id = LEADING_ID.replace(without_ext, "");

    sanitize_title(&without_id).unwrap_or_else(|| "catalog".to_owned())
}

use anyhow::Context as _;
use url::Url;

use crate::page::{Page, Pick, element_text};

/// CSS selectors describing where a site keeps catalog and chapter data.
///
/// The defaults match the manga.in.ua layout.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub title: String,
    pub advertised_chapter_count: String,
    pub description: String,
    pub chapter_items: String,
    /// Matched inside each chapter item; the last match is the chapter link.
    pub chapter_link: String,
    pub chapter_name: String,
    /// Prefix in front of the chapter name; `{title}` is replaced by the catalog title.
    pub chapter_name_prefix: String,
    pub image_items: String,
    /// Matched inside each image item; the first match carries the image URL.
    pub image_element: String,
    pub image_attrs: Vec<String>,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            title: ".UAname".to_owned(),
            advertised_chapter_count: ".circle-progress-text-max".to_owned(),
            description: ".item__full-sidebar--description".to_owned(),
            chapter_items: "#linkstocomics .ltcitems".to_owned(),
            chapter_link: "a".to_owned(),
            chapter_name: ".fastcomicsnavigatontop .youreadnow".to_owned(),
            chapter_name_prefix: "Ви читаєте: {title} - ".to_owned(),
            image_items: "#comics .xfieldimagegallery li".to_owned(),
            image_element: "[data-src], img[src]".to_owned(),
            image_attrs: vec!["data-src".to_owned(), "src".to_owned()],
        }
    }
}

/// A chapter as listed on the catalog page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterLink {
    pub name: Option<String>,
    pub url: Url,
}

#[derive(Debug, Clone)]
pub struct CatalogPage {
    /// Raw title text as shown on the page (not yet sanitized).
    pub title: String,
    pub advertised_chapter_count: Option<String>,
    pub description: Option<String>,
    pub chapters: Vec<ChapterLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterPage {
    pub display_name: Option<String>,
    pub images: Vec<String>,
}

/// Reads the catalog identity and chapter list. A missing title is fatal.
pub fn extract_catalog(layout: &SiteLayout, page: &Page) -> anyhow::Result<CatalogPage> {
    let title = page
        .text(&layout.title)
        .context("query catalog title")?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "catalog title not found ({}) on {}",
                layout.title,
                page.url()
            )
        })?;

    let advertised_chapter_count = page
        .text(&layout.advertised_chapter_count)
        .context("query advertised chapter count")?;
    let description = page
        .text(&layout.description)
        .context("query catalog description")?;

    let links = page
        .select_within(
            &layout.chapter_items,
            &layout.chapter_link,
            Pick::Last,
            |el| {
                let href = el.value().attr("href")?.trim();
                if href.is_empty() {
                    return None;
                }
                let name = element_text(el);
                Some((href.to_owned(), (!name.is_empty()).then_some(name)))
            },
        )
        .context("query chapter list")?;

    let mut chapters = Vec::with_capacity(links.len());
    for (href, name) in links {
        match page.resolve(&href) {
            Ok(url) => chapters.push(ChapterLink { name, url }),
            Err(err) => tracing::warn!(%href, ?err, "skipping chapter link that does not resolve"),
        }
    }

    Ok(CatalogPage {
        title,
        advertised_chapter_count,
        description,
        chapters,
    })
}

/// Reads the chapter name and the image URLs in on-page order.
pub fn extract_chapter(
    layout: &SiteLayout,
    page: &Page,
    catalog_title: &str,
) -> anyhow::Result<ChapterPage> {
    let display_name = page
        .text(&layout.chapter_name)
        .context("query chapter name")?
        .map(|name| strip_name_prefix(&name, &layout.chapter_name_prefix, catalog_title))
        .filter(|name| !name.is_empty());

    let raw_images = page
        .select_within(&layout.image_items, &layout.image_element, Pick::First, |el| {
            layout
                .image_attrs
                .iter()
                .filter_map(|attr| el.value().attr(attr))
                .map(str::trim)
                .find(|value| !value.is_empty())
                .map(str::to_owned)
        })
        .context("query chapter images")?;

    let mut images = Vec::with_capacity(raw_images.len());
    for (position, raw) in raw_images.iter().enumerate() {
        match page.resolve(raw) {
            Ok(url) => images.push(url.to_string()),
            Err(err) => tracing::warn!(position, %raw, ?err, "skipping image url that does not resolve"),
        }
    }

    Ok(ChapterPage {
        display_name,
        images,
    })
}

fn strip_name_prefix(name: &str, prefix_template: &str, catalog_title: &str) -> String {
    let prefix = prefix_template.replace("{title}", catalog_title);
    let prefix = prefix.trim();
    let name = name.trim();
    name.strip_prefix(prefix).unwrap_or(name).trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_HTML: &str = r#"<!doctype html>
<html><body>
  <h1 class="UAname"> Токійський гуль </h1>
  <div class="circle-progress-text-max">3</div>
  <div class="item__full-sidebar--description">16+</div>
  <div id="linkstocomics">
    <div class="ltcitems"><a href="/x">*</a><a href="/chapters/tom-1-ch-1.html">Розділ 1</a></div>
    <div class="ltcitems"><a href="https://manga.in.ua/chapters/tom-2-ch-2.html">Розділ 2</a></div>
    <div class="ltcitems"><span>announced</span></div>
  </div>
</body></html>"#;

    const CHAPTER_HTML: &str = r#"<!doctype html>
<html><body>
  <div class="fastcomicsnavigatontop"><span class="youreadnow">Ви читаєте: Токійський гуль - Розділ 1</span></div>
  <div id="comics"><ul class="xfieldimagegallery">
    <li><img id="comicspage1" data-src="https://cdn.example.com/1.jpg"></li>
    <li><img id="comicspage2" src="/img/2.png"></li>
    <li><span>ad</span></li>
    <li><img id="comicspage3" data-src=" /img/3 "></li>
  </ul></div>
</body></html>"#;

    fn page(url: &str, html: &str) -> anyhow::Result<Page> {
        Ok(Page::from_html(Url::parse(url)?, html))
    }

    #[test]
    fn extract_catalog_reads_title_and_links() -> anyhow::Result<()> {
        let page = page("https://manga.in.ua/mangas/105-tokiiskyi-gul.html", CATALOG_HTML)?;
        let catalog = extract_catalog(&SiteLayout::default(), &page)?;

        assert_eq!(catalog.title, "Токійський гуль");
        assert_eq!(catalog.advertised_chapter_count.as_deref(), Some("3"));
        assert_eq!(catalog.description.as_deref(), Some("16+"));
        assert_eq!(
            catalog.chapters,
            vec![
                ChapterLink {
                    name: Some("Розділ 1".to_owned()),
                    url: Url::parse("https://manga.in.ua/chapters/tom-1-ch-1.html")?,
                },
                ChapterLink {
                    name: Some("Розділ 2".to_owned()),
                    url: Url::parse("https://manga.in.ua/chapters/tom-2-ch-2.html")?,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn extract_catalog_without_title_fails() -> anyhow::Result<()> {
        let page = page("https://example.com/a.html", "<html><body></body></html>")?;
        assert!(extract_catalog(&SiteLayout::default(), &page).is_err());
        Ok(())
    }

    #[test]
    fn extract_chapter_keeps_image_order_and_strips_prefix() -> anyhow::Result<()> {
        let page = page("https://manga.in.ua/chapters/tom-1-ch-1.html", CHAPTER_HTML)?;
        let chapter = extract_chapter(&SiteLayout::default(), &page, "Токійський гуль")?;

        assert_eq!(chapter.display_name.as_deref(), Some("Розділ 1"));
        assert_eq!(
            chapter.images,
            vec![
                "https://cdn.example.com/1.jpg",
                "https://manga.in.ua/img/2.png",
                "https://manga.in.ua/img/3",
            ]
        );
        Ok(())
    }

    #[test]
    fn extract_chapter_tolerates_missing_parts() -> anyhow::Result<()> {
        let page = page("https://example.com/c.html", "<html><body></body></html>")?;
        let chapter = extract_chapter(&SiteLayout::default(), &page, "X")?;
        assert_eq!(chapter, ChapterPage::default());
        Ok(())
    }
}

use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use url::Url;

use crate::archive::ArchiveOutcome;
use crate::catalog::{Catalog, ChapterRecord, key_width_for};
use crate::cli::OverwriteMode;
use crate::config::PipelineConfig;
use crate::extract::{ChapterPage, SiteLayout};
use crate::fetch::{HttpImageSource, ImageSource};
use crate::formats::CatalogDump;
use crate::page::{HttpPageSource, PageSource};
use crate::prompt::OverwritePrompt;

/// The outside world a run talks to.
pub struct Collaborators<'a> {
    pub pages: &'a dyn PageSource,
    pub images: &'a dyn ImageSource,
    pub prompt: &'a dyn OverwritePrompt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterStatus {
    Archived(PathBuf),
    /// No image made it into staging.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ChapterReport {
    pub key: String,
    pub label: String,
    pub file_name: String,
    pub images_listed: usize,
    pub images_saved: usize,
    pub status: ChapterStatus,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub title: String,
    pub catalog_dir: PathBuf,
    pub dump_path: Option<PathBuf>,
    pub chapters: Vec<ChapterReport>,
}

impl RunSummary {
    pub fn archived(&self) -> usize {
        self.count(|s| matches!(s, ChapterStatus::Archived(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ChapterStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ChapterStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&ChapterStatus) -> bool) -> usize {
        self.chapters.iter().filter(|c| pred(&c.status)).count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} -> {}", self.title, self.catalog_dir.display())?;
        for chapter in &self.chapters {
            match &chapter.status {
                ChapterStatus::Archived(path) => writeln!(
                    f,
                    "  [ok]      {} ({}/{} pages) {}",
                    chapter.key,
                    chapter.images_saved,
                    chapter.images_listed,
                    path.display()
                )?,
                ChapterStatus::Skipped => writeln!(
                    f,
                    "  [skipped] {} {}: no images downloaded",
                    chapter.key, chapter.label
                )?,
                ChapterStatus::Failed(reason) => writeln!(
                    f,
                    "  [failed]  {} {}: {reason}",
                    chapter.key, chapter.label
                )?,
            }
        }
        write!(
            f,
            "archived {}, skipped {}, failed {}",
            self.archived(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Runs against the live site with the HTTP page and image backends.
pub fn run_http(
    config: &PipelineConfig,
    prompt: &dyn OverwritePrompt,
) -> anyhow::Result<RunSummary> {
    let pages = HttpPageSource::new(config.page_timeout, &config.user_agent)?;
    let images = HttpImageSource::new(config.image_timeout, &config.user_agent)?;
    run(
        config,
        &SiteLayout::default(),
        &Collaborators {
            pages: &pages,
            images: &images,
            prompt,
        },
    )
}

/// Scrapes the catalog, then names, downloads and archives every chapter in order.
///
/// Errors returned from here are fatal to the whole run. Chapter, image and
/// archive failures are recorded in the summary instead.
pub fn run(
    config: &PipelineConfig,
    layout: &SiteLayout,
    collaborators: &Collaborators<'_>,
) -> anyhow::Result<RunSummary> {
    std::fs::create_dir_all(&config.manga_root)
        .with_context(|| format!("create manga root: {}", config.manga_root.display()))?;

    tracing::info!(url = %config.catalog_url, "load catalog page");
    let catalog_page = {
        let page = collaborators
            .pages
            .open(&config.catalog_url)
            .context("load catalog page")?;
        crate::extract::extract_catalog(layout, &page).context("extract catalog")?
    };

    let key_width = key_width_for(catalog_page.chapters.len(), config.min_key_width);
    let title = crate::naming::sanitize_title(&catalog_page.title)
        .and_then(|title| crate::naming::fit_title(&title, key_width))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "catalog title {:?} has no filesystem-safe characters",
                catalog_page.title
            )
        })?;
    tracing::info!(
        %title,
        listed = catalog_page.chapters.len(),
        advertised = catalog_page.advertised_chapter_count.as_deref().unwrap_or("?"),
        description = catalog_page.description.as_deref().unwrap_or(""),
        "catalog found"
    );

    let catalog_dir = config.manga_root.join(&title);
    prepare_catalog_dir(&catalog_dir, config.overwrite, collaborators.prompt)?;

    let mut catalog = Catalog::new(
        title.clone(),
        catalog_page.chapters.len(),
        config.min_key_width,
    );
    let scrape_bar = crate::progress::chapter_bar(
        catalog_page.chapters.len(),
        "Getting pictures links",
        config.show_progress,
    );
    for (index, link) in catalog_page.chapters.iter().enumerate() {
        if index > 0 {
            std::thread::sleep(config.politeness_delay);
        }

        let mut record = ChapterRecord::new(index, link.url.as_str());
        record.display_name = link.name.clone();

        let scraped = scrape_chapter(
            config,
            layout,
            collaborators.pages,
            &link.url,
            &catalog_page.title,
        );
        match scraped {
            Ok(chapter) => {
                if chapter.display_name.is_some() {
                    record.display_name = chapter.display_name;
                }
                record.images = chapter.images;
            }
            Err(err) => {
                tracing::warn!(
                    index,
                    url = %link.url,
                    "chapter page failed, recording no images: {err:#}"
                );
            }
        }

        let key = catalog.add_chapter(index, record)?;
        tracing::info!(chapter = %key, "chapter listed");
        scrape_bar.inc(1);
    }
    scrape_bar.finish_and_clear();

    let mut dump_path = None;
    if config.save_catalog_dump {
        let path = catalog_dir.join(format!(
            "{}.json",
            crate::naming::dump_stem_from_url(&config.catalog_url)
        ));
        let mut dump = CatalogDump::new(&config.catalog_url, &catalog);
        dump.advertised_chapter_count = catalog_page.advertised_chapter_count.clone();
        dump.description = catalog_page.description.clone();
        match write_dump(&path, &dump) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "catalog dump written");
                dump_path = Some(path);
            }
            Err(err) => tracing::warn!("catalog dump not written: {err:#}"),
        }
    }

    let staging_dir = crate::staging::staging_path(&catalog_dir);
    let mut chapters = Vec::with_capacity(catalog.len());
    let download_bar =
        crate::progress::chapter_bar(catalog.len(), "Downloading images", config.show_progress);
    for (key, record) in catalog.chapters() {
        let report = process_chapter(
            config,
            collaborators.images,
            &catalog,
            key,
            record,
            &catalog_dir,
            &staging_dir,
        );
        match &report.status {
            ChapterStatus::Archived(path) => tracing::info!(
                chapter = %key,
                saved = report.images_saved,
                listed = report.images_listed,
                path = %path.display(),
                "chapter archived"
            ),
            ChapterStatus::Skipped => tracing::warn!(
                chapter = %key,
                listed = report.images_listed,
                "chapter skipped: no images"
            ),
            ChapterStatus::Failed(reason) => {
                tracing::warn!(chapter = %key, %reason, "chapter failed")
            }
        }
        chapters.push(report);
        download_bar.inc(1);
    }
    download_bar.finish_and_clear();

    if let Err(err) = crate::staging::remove(&staging_dir) {
        tracing::warn!("staging cleanup failed: {err:#}");
    }

    let summary = RunSummary {
        title,
        catalog_dir,
        dump_path,
        chapters,
    };
    tracing::info!(
        archived = summary.archived(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        "run finished"
    );
    Ok(summary)
}

/// Either leaves a fresh, empty `dir` or refuses. Declining touches nothing.
fn prepare_catalog_dir(
    dir: &Path,
    mode: OverwriteMode,
    prompt: &dyn OverwritePrompt,
) -> anyhow::Result<()> {
    if dir.exists() {
        let replace = match mode {
            OverwriteMode::Yes => true,
            OverwriteMode::No => false,
            OverwriteMode::Ask => prompt.confirm_overwrite(dir)?,
        };
        if !replace {
            anyhow::bail!("catalog directory already exists: {}", dir.display());
        }

        tracing::info!(dir = %dir.display(), "replacing existing catalog directory");
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("remove catalog dir: {}", dir.display()))?;
    }

    std::fs::create_dir_all(dir).with_context(|| format!("create catalog dir: {}", dir.display()))
}

/// The page handle lives only inside this call.
fn scrape_chapter(
    config: &PipelineConfig,
    layout: &SiteLayout,
    pages: &dyn PageSource,
    url: &Url,
    raw_title: &str,
) -> anyhow::Result<ChapterPage> {
    let page = pages.open(url).context("load chapter page")?;
    std::thread::sleep(config.settle_delay);
    crate::extract::extract_chapter(layout, &page, raw_title).context("extract chapter")
}

fn process_chapter(
    config: &PipelineConfig,
    images: &dyn ImageSource,
    catalog: &Catalog,
    key: &str,
    record: &ChapterRecord,
    catalog_dir: &Path,
    staging_dir: &Path,
) -> ChapterReport {
    let file_name = crate::naming::chapter_file_name(catalog.title(), key, &record.source_url);
    let mut report = ChapterReport {
        key: key.to_owned(),
        label: record.label(),
        file_name: file_name.clone(),
        images_listed: record.images.len(),
        images_saved: 0,
        status: ChapterStatus::Skipped,
    };

    if let Err(err) = crate::staging::prepare(staging_dir) {
        report.status = ChapterStatus::Failed(format!("{err:#}"));
        return report;
    }

    tracing::info!(chapter = %key, images = record.images.len(), %file_name, "downloading chapter");
    let fetched = crate::fetch::fetch_chapter_images(
        images,
        &record.images,
        staging_dir,
        &config.default_extension,
        &config.plausibility,
    );
    match fetched {
        Ok(fetch_report) => report.images_saved = fetch_report.saved(),
        Err(err) => {
            if let Err(cleanup) = crate::staging::remove(staging_dir) {
                tracing::warn!("staging cleanup failed: {cleanup:#}");
            }
            report.status = ChapterStatus::Failed(format!("{err:#}"));
            return report;
        }
    }

    report.status = match crate::archive::build_cbz(
        staging_dir,
        catalog_dir,
        &file_name,
        config.compression,
    ) {
        ArchiveOutcome::Archived { path, .. } => ChapterStatus::Archived(path),
        ArchiveOutcome::Skipped => ChapterStatus::Skipped,
        ArchiveOutcome::Failed(err) => ChapterStatus::Failed(format!("{err:#}")),
    };
    report
}

fn write_dump(path: &Path, dump: &CatalogDump<'_>) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .with_context(|| format!("create catalog dump: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, dump).context("serialize catalog dump")?;
    out.write_all(b"\n").context("write catalog dump newline")?;
    out.flush().context("flush catalog dump")?;
    Ok(())
}

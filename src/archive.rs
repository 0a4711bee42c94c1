use std::fs::File;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use zip::write::SimpleFileOptions;

use crate::cli::CompressionMode;

pub const CBZ_EXTENSION: &str = "cbz";

#[derive(Debug)]
pub enum ArchiveOutcome {
    Archived { path: PathBuf, pages: usize },
    /// Staging held no files; nothing was written.
    Skipped,
    Failed(anyhow::Error),
}

/// Seals `staging_dir` into `{dest_dir}/{file_name}.cbz`.
///
/// The staging directory is removed afterwards whatever the outcome.
pub fn build_cbz(
    staging_dir: &Path,
    dest_dir: &Path,
    file_name: &str,
    compression: CompressionMode,
) -> ArchiveOutcome {
    let outcome = match crate::staging::list_files(staging_dir) {
        Ok(files) if files.is_empty() => ArchiveOutcome::Skipped,
        Ok(files) => match write_cbz(&files, dest_dir, file_name, compression) {
            Ok(path) => ArchiveOutcome::Archived {
                path,
                pages: files.len(),
            },
            Err(err) => ArchiveOutcome::Failed(err),
        },
        Err(err) if is_not_found(&err) => ArchiveOutcome::Skipped,
        Err(err) => ArchiveOutcome::Failed(err),
    };

    if let Err(err) = crate::staging::remove(staging_dir) {
        tracing::warn!(dir = %staging_dir.display(), ?err, "failed to remove staging dir");
    }

    outcome
}

fn write_cbz(
    files: &[PathBuf],
    dest_dir: &Path,
    file_name: &str,
    compression: CompressionMode,
) -> anyhow::Result<PathBuf> {
    let zip_path = dest_dir.join(format!("{file_name}.zip"));
    let cbz_path = dest_dir.join(format!("{file_name}.{CBZ_EXTENSION}"));

    if let Err(err) = write_zip(files, &zip_path, compression) {
        let _ = std::fs::remove_file(&zip_path);
        return Err(err);
    }

    let renamed = std::fs::rename(&zip_path, &cbz_path)
        .with_context(|| format!("rename {} -> {}", zip_path.display(), cbz_path.display()));
    if renamed.is_err() {
        let _ = std::fs::remove_file(&zip_path);
    }
    renamed?;

    Ok(cbz_path)
}

fn write_zip(
    files: &[PathBuf],
    zip_path: &Path,
    compression: CompressionMode,
) -> anyhow::Result<()> {
    let out_file = File::create(zip_path)
        .with_context(|| format!("create archive: {}", zip_path.display()))?;
    let mut zip = zip::ZipWriter::new(out_file);

    let method = match compression {
        CompressionMode::Stored => zip::CompressionMethod::Stored,
        CompressionMode::Deflated => zip::CompressionMethod::Deflated,
    };
    let options = SimpleFileOptions::default()
        .compression_method(method)
        .unix_permissions(0o644);

    for path in files {
        let entry_name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("staging file has no name: {}", path.display()))?
            .to_string_lossy()
            .to_string();

        zip.start_file(entry_name.as_str(), options)
            .with_context(|| format!("zip start_file: {entry_name}"))?;
        let mut f = File::open(path).with_context(|| format!("open: {}", path.display()))?;
        io::copy(&mut f, &mut zip).with_context(|| format!("zip write: {entry_name}"))?;
    }

    let mut out_file = zip.finish().context("zip finish")?;
    out_file.flush().context("flush archive")?;
    Ok(())
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|io_err| io_err.kind() == io::ErrorKind::NotFound)
}

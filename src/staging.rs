use std::path::{Path, PathBuf};

use anyhow::Context as _;

pub const STAGING_DIR_NAME: &str = "temp";

pub fn staging_path(catalog_dir: &Path) -> PathBuf {
    catalog_dir.join(STAGING_DIR_NAME)
}

/// Leaves an empty staging directory at `dir`, removing leftovers first.
pub fn prepare(dir: &Path) -> anyhow::Result<()> {
    remove(dir)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create staging dir: {}", dir.display()))?;
    Ok(())
}

/// Removes `dir` and everything in it. Missing directories are fine.
pub fn remove(dir: &Path) -> anyhow::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove staging dir: {}", dir.display())),
    }
}

/// Regular files directly inside `dir`, sorted by name. Subdirectories are ignored.
pub fn list_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("read staging dir: {}", dir.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("list staging dir: {}", dir.display()))?;
    entries.sort_by_key(|e| e.file_name());

    let mut files = Vec::with_capacity(entries.len());
    for entry in entries {
        let file_type = entry.file_type().context("read staging entry type")?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

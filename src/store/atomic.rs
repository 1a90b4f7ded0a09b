/// Crash-safe replacement of the store file.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use super::paths;

/// Writes `bytes` to `path` so readers see either the old or the new document.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    write_atomic_with(path, bytes, |tmp, target| {
        // Dropping the PersistError's file handle removes the temp file.
        tmp.persist(target)
            .map(|_| ())
            .map_err(|e| e.error)
            .with_context(|| format!("replacing {}", target.display()))
    })
}

/// Same as [`write_atomic`] with the final commit step supplied by the caller.
/// The temp file is removed whenever `commit` fails.
pub(crate) fn write_atomic_with<F>(path: &Path, bytes: &[u8], commit: F) -> Result<()>
where
    F: FnOnce(NamedTempFile, &Path) -> Result<()>,
{
    backup_existing(path);

    let dir = parent_dir(path);
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".labels-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("writing temporary file for {}", path.display()))?;
    tmp.flush()
        .with_context(|| format!("flushing temporary file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("syncing temporary file for {}", path.display()))?;

    commit(tmp, path)
}

/// Copies the current file to `<name>.bak`. Failure is logged, not returned.
fn backup_existing(path: &Path) {
    if !path.is_file() {
        return;
    }
    let backup = paths::backup_path(path);
    if let Err(e) = fs::copy(path, &backup) {
        log::warn!("Could not back up {} to {}: {e}", path.display(), backup.display());
    }
}

/// Copies an unreadable store aside as `labels_corrupt_<epoch>.json`, unless
/// a copy with the same contents is already there.
pub fn preserve_corrupt(path: &Path, bytes: &[u8]) -> Option<PathBuf> {
    if let Some(existing) = paths::find_preserved_copy(path, "corrupt", bytes) {
        log::debug!("Corrupt store already preserved as {}", existing.display());
        return None;
    }
    let copy = paths::timestamped_path(path, "corrupt", paths::now_epoch_secs());
    match fs::write(&copy, bytes) {
        Ok(()) => Some(copy),
        Err(e) => {
            log::warn!("Could not preserve corrupt store {}: {e}", path.display());
            None
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// One-time move of the store out of the install directory.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::paths;

#[derive(Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No legacy file present.
    NothingToDo,
    /// Legacy file moved to the new location.
    Moved,
    /// New location already populated; legacy file copied aside for manual recovery.
    PreservedLegacyCopy(PathBuf),
    /// A copy with the legacy file's contents was made on an earlier run.
    AlreadyPreserved(PathBuf),
}

/// Moves `legacy` to `target` unless `target` already exists, in which case the
/// legacy file is copied next to `target` under a timestamped name. The copy
/// is made once per distinct legacy content.
pub fn migrate_legacy(legacy: &Path, target: &Path) -> Result<MigrationOutcome> {
    if legacy == target || !legacy.is_file() {
        return Ok(MigrationOutcome::NothingToDo);
    }
    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating store directory {}", dir.display()))?;
    }

    if target.exists() {
        let bytes = fs::read(legacy)
            .with_context(|| format!("reading legacy store {}", legacy.display()))?;
        if let Some(existing) = paths::find_preserved_copy(target, "legacy_copy", &bytes) {
            return Ok(MigrationOutcome::AlreadyPreserved(existing));
        }
        let copy = paths::timestamped_path(target, "legacy_copy", paths::now_epoch_secs());
        fs::write(&copy, &bytes)
            .with_context(|| format!("copying legacy store to {}", copy.display()))?;
        return Ok(MigrationOutcome::PreservedLegacyCopy(copy));
    }

    if fs::rename(legacy, target).is_err() {
        // Cross-device moves cannot rename.
        fs::copy(legacy, target)
            .with_context(|| format!("copying legacy store to {}", target.display()))?;
        fs::remove_file(legacy)
            .with_context(|| format!("removing legacy store {}", legacy.display()))?;
    }
    Ok(MigrationOutcome::Moved)
}

/// Runs the migration, logging instead of failing.
pub fn run_migrations(legacy: Option<&Path>, target: &Path) {
    let Some(legacy) = legacy else {
        return;
    };
    match migrate_legacy(legacy, target) {
        Ok(MigrationOutcome::NothingToDo) => {}
        Ok(MigrationOutcome::AlreadyPreserved(copy)) => {
            log::debug!("Legacy label store already kept as {}", copy.display());
        }
        Ok(MigrationOutcome::Moved) => {
            log::info!(
                "Migrated label store from {} to {}",
                legacy.display(),
                target.display()
            );
        }
        Ok(MigrationOutcome::PreservedLegacyCopy(copy)) => {
            log::info!(
                "Label store already exists at {}, legacy file kept as {}",
                target.display(),
                copy.display()
            );
        }
        Err(e) => log::warn!("Label store migration failed: {e:#}"),
    }
}

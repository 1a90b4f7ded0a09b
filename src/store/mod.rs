/// JSON-backed label group store with legacy migration and corruption recovery.
mod atomic;
mod migrations;
mod paths;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::types::{LabelColor, LabelGroup};

pub use atomic::write_atomic;
pub use migrations::{MigrationOutcome, migrate_legacy};
pub use paths::{APP_DIR, STORE_FILE, StoreConfig, backup_path, default_legacy_file};

/// Parsed store file: group name -> raw group value.
type Document = Map<String, Value>;

/// What a read of the store file found.
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    Missing,
    Loaded(Document),
    /// Exists but could not be read. Reads degrade to empty; writes refuse.
    Unreadable(std::io::Error),
    /// Not a JSON object; treated as empty after copying it aside.
    Corrupt,
}

/// Durable label groups. Every call re-reads the file, so external edits are
/// always visible.
#[derive(Clone, Debug)]
pub struct GroupStore {
    path: PathBuf,
}

impl GroupStore {
    /// Resolves the store location and migrates a legacy file if one is found.
    pub fn open(config: &StoreConfig) -> Self {
        let path = config.store_file();
        migrations::run_migrations(config.legacy_file().as_deref(), &path);
        log::debug!("Using label store at {}", path.display());
        Self { path }
    }

    /// Store backed by `path` directly.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn read_document(&self) -> ReadOutcome {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return ReadOutcome::Missing,
            Err(e) => {
                log::warn!("Could not read {}: {e}", self.path.display());
                return ReadOutcome::Unreadable(e);
            }
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(document)) => ReadOutcome::Loaded(document),
            Ok(_) | Err(_) => {
                log::warn!(
                    "Label store {} is not a JSON object, treating it as empty",
                    self.path.display()
                );
                if let Some(copy) = atomic::preserve_corrupt(&self.path, &bytes) {
                    log::info!("Corrupt label store preserved as {}", copy.display());
                }
                ReadOutcome::Corrupt
            }
        }
    }

    fn document(&self) -> Document {
        match self.read_document() {
            ReadOutcome::Loaded(document) => document,
            _ => Document::new(),
        }
    }

    /// Current document for a read-modify-write. An unreadable file is an error so
    /// the write cannot replace groups it never saw.
    fn document_for_write(&self) -> Result<Option<Document>> {
        match self.read_document() {
            ReadOutcome::Loaded(document) => Ok(Some(document)),
            ReadOutcome::Missing | ReadOutcome::Corrupt => Ok(None),
            ReadOutcome::Unreadable(e) => {
                Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        }
    }

    fn write_document(&self, document: Document) -> Result<()> {
        let mut text = serde_json::to_string_pretty(&Value::Object(document))
            .context("serializing label groups")?;
        text.push('\n');
        write_atomic(&self.path, text.as_bytes())
    }

    /// Group names in stored order. Empty when the file is missing or unreadable.
    pub fn list_groups(&self) -> Vec<String> {
        self.document().keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.document().contains_key(name)
    }

    /// The group stored under `name`, or an empty group when absent.
    ///
    /// A group value that is not an object loads as empty. A label whose color is
    /// not `[r, g, b]` in range gets a random color.
    pub fn load_group(&self, name: &str) -> LabelGroup {
        let mut document = self.document();
        match document.remove(name) {
            Some(Value::Object(labels)) => labels
                .into_iter()
                .map(|(label, value)| {
                    let color = LabelColor::from_json(&value).unwrap_or_else(|| {
                        log::warn!("Invalid color {value} for label '{label}', using a random one");
                        LabelColor::random()
                    });
                    (label, color)
                })
                .collect(),
            Some(other) => {
                log::warn!("Group '{name}' is malformed ({other}), treating it as empty");
                LabelGroup::new()
            }
            None => LabelGroup::new(),
        }
    }

    /// Creates or fully replaces the group stored under `name`.
    pub fn save_group(&self, name: &str, group: &LabelGroup) -> Result<()> {
        let mut document = self.document_for_write()?.unwrap_or_default();
        let value = serde_json::to_value(group).context("serializing label group")?;
        document.insert(name.to_string(), value);
        self.write_document(document)?;
        log::debug!("Saved group '{name}' with {} labels", group.len());
        Ok(())
    }

    /// Removes `name`. Returns `false` when there was nothing to remove.
    pub fn delete_group(&self, name: &str) -> Result<bool> {
        let Some(mut document) = self.document_for_write()? else {
            return Ok(false);
        };
        if document.shift_remove(name).is_none() {
            return Ok(false);
        }
        self.write_document(document)?;
        log::debug!("Deleted group '{name}'");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> GroupStore {
        GroupStore::open(&StoreConfig::in_dir(dir))
    }

    fn corrupt_copies(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with("labels_corrupt_")
            })
            .collect()
    }

    fn bones() -> LabelGroup {
        LabelGroup::from([
            ("Femur".to_string(), LabelColor::new(0.875, 0.125, 0.125)),
            ("Skull".to_string(), LabelColor::new(0.125, 0.34375, 0.875)),
        ])
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.list_groups().is_empty());
        assert!(store.load_group("Bones").is_empty());
        assert!(!store.delete_group("Bones").unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let group = LabelGroup::from([
            ("Zeta".to_string(), LabelColor::new(0.1, 0.2, 0.3)),
            ("Alpha".to_string(), LabelColor::new(0.4, 0.5, 0.6)),
            ("Mid".to_string(), LabelColor::new(0.7, 0.8, 0.9)),
        ]);
        store.save_group("Ordered", &group).unwrap();
        let loaded = store.load_group("Ordered");
        assert_eq!(loaded, group);
        assert_eq!(
            loaded.keys().collect::<Vec<_>>(),
            vec!["Zeta", "Alpha", "Mid"]
        );
    }

    #[test]
    fn test_save_replaces_instead_of_merging() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.save_group("Bones", &bones()).unwrap();
        let replacement =
            LabelGroup::from([("Tibia".to_string(), LabelColor::new(0.5, 0.5, 0.5))]);
        store.save_group("Bones", &replacement).unwrap();
        assert_eq!(store.load_group("Bones"), replacement);
        assert_eq!(store.list_groups(), vec!["Bones"]);
    }

    #[test]
    fn test_delete_absent_leaves_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.save_group("Bones", &bones()).unwrap();
        let before = fs::read(store.path()).unwrap();
        assert!(!store.delete_group("Organs").unwrap());
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_delete_keeps_remaining_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        for name in ["A", "B", "C"] {
            store.save_group(name, &bones()).unwrap();
        }
        assert!(store.delete_group("A").unwrap());
        assert_eq!(store.list_groups(), vec!["B", "C"]);
    }

    #[test]
    fn test_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let group = LabelGroup::from([("Femur".to_string(), LabelColor::new(1.0, 0.5, 0.0))]);
        store.save_group("Bones", &group).unwrap();
        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            text,
            "{\n  \"Bones\": {\n    \"Femur\": [\n      1.0,\n      0.5,\n      0.0\n    ]\n  }\n}\n"
        );
    }

    #[test]
    fn test_corrupt_file_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), b"{not json at all").unwrap();

        assert!(store.list_groups().is_empty());

        let copies = corrupt_copies(dir.path());
        assert_eq!(copies.len(), 1);
        assert_eq!(fs::read(&copies[0]).unwrap(), b"{not json at all");
    }

    #[test]
    fn test_non_object_root_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), b"[1, 2, 3]").unwrap();
        assert!(matches!(
            store.read_document(),
            ReadOutcome::Corrupt
        ));
    }

    #[test]
    fn test_corrupt_file_preserved_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), b"garbage").unwrap();

        assert!(store.list_groups().is_empty());
        // Cross a second boundary so a new copy would get a new name.
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(store.list_groups().is_empty());
        assert!(!store.contains("Bones"));

        assert_eq!(corrupt_copies(dir.path()).len(), 1);
    }

    #[test]
    fn test_unreadable_store_refuses_writes() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the store path fails to read even with elevated permissions.
        let store = GroupStore::at(dir.path().join(STORE_FILE));
        fs::create_dir(store.path()).unwrap();
        fs::write(store.path().join("keep"), b"data").unwrap();

        assert!(store.list_groups().is_empty());
        assert!(store.save_group("Bones", &bones()).is_err());
        assert!(store.delete_group("Bones").is_err());
        assert!(store.path().is_dir());
        assert_eq!(fs::read(store.path().join("keep")).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_denied_keeps_existing_groups() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.save_group("Bones", &bones()).unwrap();
        store.save_group("Organs", &bones()).unwrap();
        let before = fs::read(store.path()).unwrap();

        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(store.path()).is_ok() {
            // Running with privileges that ignore file modes.
            fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();
            return;
        }
        let result = store.save_group("Vessels", &bones());
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        assert!(result.is_err());
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert_eq!(store.list_groups(), vec!["Bones", "Organs"]);
    }

    #[test]
    fn test_save_over_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), b"garbage").unwrap();
        store.save_group("Bones", &bones()).unwrap();
        assert_eq!(store.load_group("Bones"), bones());
        assert_eq!(fs::read(backup_path(store.path())).unwrap(), b"garbage");
    }

    #[test]
    fn test_malformed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(
            store.path(),
            r#"{"Broken": [1, 2], "Mixed": {"Good": [0.0, 0.5, 1.0], "Bad": "red"}}"#,
        )
        .unwrap();

        assert_eq!(store.list_groups(), vec!["Broken", "Mixed"]);
        assert!(store.load_group("Broken").is_empty());

        let mixed = store.load_group("Mixed");
        assert_eq!(mixed.keys().collect::<Vec<_>>(), vec!["Good", "Bad"]);
        assert_eq!(mixed["Good"], LabelColor::new(0.0, 0.5, 1.0));
        assert!(LabelColor::from_components(&mixed["Bad"].to_array()).is_some());
    }

    #[test]
    fn test_external_edits_are_visible() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.save_group("Bones", &bones()).unwrap();
        fs::write(store.path(), r#"{"Edited": {}}"#).unwrap();
        assert_eq!(store.list_groups(), vec!["Edited"]);
        assert!(!store.contains("Bones"));
    }

    #[test]
    fn test_open_migrates_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("install").join(STORE_FILE);
        fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        fs::write(&legacy, r#"{"Legacy": {"Femur": [0.1, 0.2, 0.3]}}"#).unwrap();

        let config = StoreConfig {
            legacy_file: Some(legacy.clone()),
            ..StoreConfig::in_dir(dir.path().join("user"))
        };
        let store = GroupStore::open(&config);

        assert!(!legacy.exists());
        assert!(store.path().exists());
        assert_eq!(store.list_groups(), vec!["Legacy"]);
    }
}

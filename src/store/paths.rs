/// Store location resolution and backup artifact naming.
use std::fs;
use std::path::{Path, PathBuf};

/// Subdirectory owned by this tool inside the per-user settings directory.
pub const APP_DIR: &str = "seglabels";
pub const STORE_FILE: &str = "labels.json";

/// Ambient host state handed to the store explicitly.
#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    /// Path of the host application's user-settings file. Its directory is the settings root.
    pub host_settings_file: Option<PathBuf>,
    /// Where older installs kept `labels.json`. Defaults to the executable's directory.
    pub legacy_file: Option<PathBuf>,
    /// Use this directory as-is, skipping resolution.
    pub store_dir: Option<PathBuf>,
}

impl StoreConfig {
    /// Config that pins the store to `dir` with no legacy location.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn store_dir(&self) -> PathBuf {
        if let Some(dir) = &self.store_dir {
            return dir.clone();
        }
        let settings_root = self
            .host_settings_file
            .as_deref()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);
        match settings_root.or_else(dirs::data_local_dir) {
            Some(root) => root.join(APP_DIR),
            None => PathBuf::from(APP_DIR),
        }
    }

    pub fn store_file(&self) -> PathBuf {
        self.store_dir().join(STORE_FILE)
    }

    /// Legacy file to migrate from, if any. An explicit `store_dir` disables the default.
    pub fn legacy_file(&self) -> Option<PathBuf> {
        if let Some(file) = &self.legacy_file {
            return Some(file.clone());
        }
        if self.store_dir.is_some() {
            return None;
        }
        default_legacy_file()
    }
}

/// `labels.json` next to the running executable.
pub fn default_legacy_file() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join(STORE_FILE))
}

/// `labels.json.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// `labels_<tag>_<epoch>.json`
pub fn timestamped_path(path: &Path, tag: &str, epoch_secs: i64) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "labels".to_string());
    path.with_file_name(format!("{stem}_{tag}_{epoch_secs}.json"))
}

/// An existing `labels_<tag>_*.json` next to `path` whose contents equal `bytes`.
pub fn find_preserved_copy(path: &Path, tag: &str, bytes: &[u8]) -> Option<PathBuf> {
    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty())?;
    let stem = path.file_stem()?.to_string_lossy().into_owned();
    let prefix = format!("{stem}_{tag}_");
    fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|candidate| {
            candidate
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with(&prefix))
        })
        .find(|candidate| fs::read(candidate).is_ok_and(|existing| existing == bytes))
}

pub fn now_epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// String-keyed blob storage, the shape of a browser's `localStorage`.
pub trait Storage {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Makes every following `save` fail, as a full quota would.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        if self.fail_writes {
            bail!("storage quota exceeded while writing {key}");
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    pub data_dir: PathBuf,
}

impl FileStorage {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file storage");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
            || key.starts_with('.')
        {
            return Err(anyhow!("invalid storage key: {key:?}"));
        }
        Ok(self.data_dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    #[tracing::instrument(skip(self))]
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => {
                debug!(file = %path.display(), bytes = raw.len(), "loaded blob");
                Ok(Some(raw))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(file = %path.display(), "no blob on disk");
                Ok(None)
            }
            Err(err) => {
                Err(err).with_context(|| format!("failed reading {}", path.display()))
            }
        }
    }

    #[tracing::instrument(skip(self, value))]
    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        save_atomic(&path, value).with_context(|| format!("failed to save {}", path.display()))
    }
}

fn save_atomic(path: &Path, value: &str) -> anyhow::Result<()> {
    debug!(file = %path.display(), bytes = value.len(), "saving blob atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(value.as_bytes())?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

/// `window.localStorage` in the browser.
#[cfg(all(feature = "web", target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
impl LocalStorage {
    fn storage() -> anyhow::Result<web_sys::Storage> {
        web_sys::window()
            .and_then(|window| window.local_storage().ok().flatten())
            .ok_or_else(|| anyhow!("local storage is not available"))
    }
}

#[cfg(all(feature = "web", target_arch = "wasm32"))]
impl Storage for LocalStorage {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        Self::storage()?
            .get_item(key)
            .map_err(|err| anyhow!("failed reading local storage key {key}: {err:?}"))
    }

    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|err| anyhow!("failed writing local storage key {key}: {err:?}"))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{FileStorage, MemoryStorage, Storage};

    #[test]
    fn memory_storage_can_refuse_writes() {
        let mut storage = MemoryStorage::new().with_value("k", "[]");
        storage.set_fail_writes(true);
        assert!(storage.save("k", "[1]").is_err());
        assert_eq!(storage.get("k"), Some("[]"));

        storage.set_fail_writes(false);
        storage.save("k", "[1]").expect("save");
        assert_eq!(storage.load("k").expect("load").as_deref(), Some("[1]"));
    }

    #[test]
    fn file_storage_missing_key_is_absent() {
        let temp = tempdir().expect("tempdir");
        let mut storage = FileStorage::open(&temp.path().join("data")).expect("open");
        assert_eq!(storage.load("taskmate_tasks").expect("load"), None);

        storage.save("taskmate_tasks", "[]").expect("save");
        assert_eq!(
            storage.load("taskmate_tasks").expect("load").as_deref(),
            Some("[]")
        );
        assert!(temp.path().join("data/taskmate_tasks.json").exists());
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let temp = tempdir().expect("tempdir");
        let storage = FileStorage::open(temp.path()).expect("open");
        assert!(storage.path_for("../escape").is_err());
        assert!(storage.path_for("a/b").is_err());
        assert!(storage.path_for("").is_err());
    }
}

//! Preference storage backends.
//!
//! A backend is the host's key/value store. The browser's extension storage
//! is one; for tools and tests the crate ships an in-memory map and a JSON
//! file store.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::PreferenceRecord;

/// Host key/value store holding one JSON value per feature identifier.
pub trait PreferenceBackend {
    /// Every stored key and value.
    fn load_all(&self) -> anyhow::Result<PreferenceRecord>;

    fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;

    fn set(&mut self, key: &str, value: Value) -> anyhow::Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

/// Ephemeral store, lost when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    values: PreferenceRecord,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing values.
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl PreferenceBackend for MemoryBackend {
    fn load_all(&self) -> anyhow::Result<PreferenceRecord> {
        Ok(self.values.clone())
    }

    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Preference storage backed by a JSON file.
///
/// Data is cached in memory and written to disk on modification.
pub struct JsonFileBackend {
    /// Path to the storage file.
    path: PathBuf,
    /// In-memory cache of stored values.
    cache: PreferenceRecord,
    /// Whether the cache has uncommitted changes.
    dirty: bool,
}

impl JsonFileBackend {
    /// Open the store at `path`, loading it if it exists.
    ///
    /// An unreadable or corrupt file starts an empty store; the next write
    /// replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let cache = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Ignoring corrupt preferences file {}: {}", path.display(), e);
                    PreferenceRecord::new()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read preferences file {}: {}", path.display(), e);
                    PreferenceRecord::new()
                }
            }
        } else {
            PreferenceRecord::new()
        };

        Self {
            path,
            cache,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush cached changes to disk.
    pub fn flush(&mut self) -> anyhow::Result<()> {
        if !self.dirty {
            return Ok(());
        }

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create preferences directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }

        let contents = serde_json::to_string_pretty(&self.cache)?;
        fs::write(&self.path, contents).map_err(|e| {
            anyhow::anyhow!("Failed to write preferences {}: {}", self.path.display(), e)
        })?;

        self.dirty = false;
        Ok(())
    }
}

impl PreferenceBackend for JsonFileBackend {
    fn load_all(&self) -> anyhow::Result<PreferenceRecord> {
        Ok(self.cache.clone())
    }

    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.cache.get(key).cloned())
    }

    /// The value is immediately written to disk.
    fn set(&mut self, key: &str, value: Value) -> anyhow::Result<()> {
        self.cache.insert(key.to_string(), value);
        self.dirty = true;
        self.flush()
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        if self.cache.remove(key).is_some() {
            self.dirty = true;
            self.flush()?;
        }
        Ok(())
    }
}

impl Drop for JsonFileBackend {
    fn drop(&mut self) {
        // Best-effort flush on drop
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_file_backend_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("preferences.json");

        {
            let mut backend = JsonFileBackend::open(&path);
            backend.set("hideTrends", json!(true)).unwrap();
            backend.set("timecodes", json!(false)).unwrap();
        }

        let backend = JsonFileBackend::open(&path);
        assert_eq!(backend.get("hideTrends").unwrap(), Some(json!(true)));
        assert_eq!(backend.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_file_backend_remove() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preferences.json");
        let mut backend = JsonFileBackend::open(&path);

        backend.set("legacy", json!("x")).unwrap();
        backend.remove("legacy").unwrap();
        backend.remove("never-set").unwrap();

        assert_eq!(backend.get("legacy").unwrap(), None);
        let on_disk: PreferenceRecord =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(on_disk.is_empty());
    }

    #[test]
    fn test_file_backend_corrupt_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preferences.json");
        fs::write(&path, "{not json").unwrap();

        let mut backend = JsonFileBackend::open(&path);
        assert!(backend.load_all().unwrap().is_empty());

        backend.set("ultraWide", json!(true)).unwrap();
        let reopened = JsonFileBackend::open(&path);
        assert_eq!(reopened.get("ultraWide").unwrap(), Some(json!(true)));
    }

    #[test]
    fn test_memory_backend() {
        let mut backend = MemoryBackend::with_values([("a", json!(true))]);
        backend.set("b", json!(false)).unwrap();
        backend.remove("a").unwrap();
        let all = backend.load_all().unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["b"]);
    }
}

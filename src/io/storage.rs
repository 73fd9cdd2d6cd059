use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::io::lock::{DEFAULT_WAIT, KeyLock, LockError};

/// Error type for key-value storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage error on key {key}: {source}")]
    Io { key: String, source: io::Error },
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("storage quota exceeded writing key {key}")]
    QuotaExceeded { key: String },
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A string-keyed store of text values.
///
/// All persisted state goes through this interface, so the stores never
/// care whether values live in memory or on disk.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Whatever can be salvaged of a value that `get` failed to read, with
    /// invalid UTF-8 replaced. `None` when nothing is readable.
    fn salvage(&self, key: &str) -> Option<String> {
        self.get(key).ok().flatten()
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Map-backed store with an optional byte quota over all values
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes once the total value size would exceed `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        MemoryStore {
            entries: HashMap::new(),
            quota: Some(bytes),
        }
    }

    fn used_bytes_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota
            && self.used_bytes_excluding(key) + value.len() > quota
        {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
            });
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Directory store
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: &Path) -> Self {
        DirStore {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file a key is stored in
    pub fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    fn salvage(&self, key: &str) -> Option<String> {
        let bytes = fs::read(self.key_path(key).ok()?).ok()?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        let _lock = KeyLock::acquire(&self.dir, key, DEFAULT_WAIT)?;
        atomic_write(&path, value.as_bytes()).map_err(|e| StorageError::Io {
            key: key.to_string(),
            source: e,
        })
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        let _lock = KeyLock::acquire(&self.dir, key, DEFAULT_WAIT)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io {
                key: key.to_string(),
                source: e,
            }),
        }
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_get_put_delete() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.put("k", "v1").unwrap();
        store.put("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn memory_store_quota_counts_other_keys() {
        let mut store = MemoryStore::with_quota(10);
        store.put("a", "123456").unwrap();
        // Replacing a key only counts its new size
        store.put("a", "1234567").unwrap();
        let err = store.put("b", "1234").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { ref key } if key == "b"));
        assert_eq!(store.get("b").unwrap(), None);
    }

    #[test]
    fn dir_store_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirStore::new(tmp.path());
        store.put("leadTrackerData", "[]").unwrap();
        assert!(tmp.path().join("leadTrackerData.json").exists());
        assert_eq!(store.get("leadTrackerData").unwrap().as_deref(), Some("[]"));
        store.delete("leadTrackerData").unwrap();
        assert_eq!(store.get("leadTrackerData").unwrap(), None);
        // Deleting twice is fine
        store.delete("leadTrackerData").unwrap();
    }

    #[test]
    fn dir_store_rejects_path_like_keys() {
        let tmp = TempDir::new().unwrap();
        let store = DirStore::new(tmp.path());
        assert!(matches!(
            store.get("../escape"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(store.get(".lock"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(store.get(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn dir_store_salvages_invalid_utf8() {
        let tmp = TempDir::new().unwrap();
        let store = DirStore::new(tmp.path());
        fs::write(tmp.path().join("taskTrackerTasksGrouped.json"), b"{\"title\": \"caf\xe9\"}").unwrap();
        assert!(matches!(
            store.get("taskTrackerTasksGrouped"),
            Err(StorageError::Io { .. })
        ));
        assert_eq!(
            store.salvage("taskTrackerTasksGrouped").as_deref(),
            Some("{\"title\": \"caf\u{FFFD}\"}")
        );
        assert_eq!(store.salvage("missing"), None);
    }
}

//! Key/value storage backends
//!
//! The history store and preferences persist one serialized value per
//! well-known key. `FileStorage` keeps each key in its own JSON file and
//! replaces it atomically; `MemoryStorage` backs tests and dry runs.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{HearingError, Result};

/// Extension of the file holding a key's value.
const VALUE_EXTENSION: &str = "json";

/// Extension of the scratch file written before an atomic replace.
const TEMP_EXTENSION: &str = "json.tmp";

/// Persistence boundary for serialized values
pub trait StorageBackend {
    /// Read the value stored under `key`, or `None` if nothing is stored.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`. Readers see either the old or the
    /// new value, never a partial write.
    fn write(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is a no-op.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One file per key inside a data directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a backend rooted at `dir`. The directory is created on first write.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// The data directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, VALUE_EXTENSION))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HearingError::StorageRead {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        write_atomic(&self.path_for(key), value.as_bytes()).map_err(|e| {
            HearingError::StorageWrite {
                key: key.to_string(),
                source: e,
            }
        })
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HearingError::StorageWrite {
                key: key.to_string(),
                source: e,
            }),
        }
    }
}

/// In-process storage, lost when dropped
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Write `bytes` next to `path`, then rename over it.
///
/// A crash mid-write leaves the previous file untouched.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    fs::create_dir_all(parent)?;

    let tmp = path.with_extension(TEMP_EXTENSION);
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_missing_key() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        assert_eq!(storage.read("nothing").unwrap(), None);
    }

    #[test]
    fn test_file_storage_write_read_remove() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(&dir.path().join("nested"));

        storage.write("key", "[1,2,3]").unwrap();
        assert_eq!(storage.read("key").unwrap().as_deref(), Some("[1,2,3]"));

        storage.write("key", "[]").unwrap();
        assert_eq!(storage.read("key").unwrap().as_deref(), Some("[]"));

        storage.remove("key").unwrap();
        storage.remove("key").unwrap();
        assert_eq!(storage.read("key").unwrap(), None);
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path());
        storage.write("results", "[]").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["results.json".to_string()]);
    }

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryStorage::new();
        storage.write("a", "1").unwrap();
        assert_eq!(storage.read("a").unwrap().as_deref(), Some("1"));
        storage.remove("a").unwrap();
        assert_eq!(storage.read("a").unwrap(), None);
    }
}

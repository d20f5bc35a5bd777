//! Token storage adapters.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::ports::{StorageError, TokenStorage};

/// Token storage persisted as a flat JSON object in a single file.
///
/// The whole map is rewritten on every change; reads are served from memory.
pub struct FileTokenStorage {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileTokenStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// A missing file is an empty store. A corrupt file is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = entries.len(), "token storage opened");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(entries)?;
        let mut file = open_private(&self.path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// Open `path` for rewriting, readable by the owner only.
#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten files left by older runs.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::File::create(path)
}

impl TokenStorage for FileTokenStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write();
        if entries.remove(key).is_none() {
            return Ok(());
        }
        if let Err(e) = self.persist(&entries) {
            warn!(key, error = %e, "failed to persist token removal");
            return Err(e);
        }
        Ok(())
    }
}

/// Volatile token storage.
#[derive(Default)]
pub struct MemoryTokenStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a key, e.g. a token already obtained elsewhere.
    pub fn with(self, key: &str, value: &str) -> Self {
        self.entries.write().insert(key.to_string(), value.to_string());
        self
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");

        let storage = FileTokenStorage::open(&path).unwrap();
        assert!(storage.get("auth_token").is_none());
        storage.set("auth_token", "abc").unwrap();
        storage.set("refresh_token", "def").unwrap();
        drop(storage);

        let reopened = FileTokenStorage::open(&path).unwrap();
        assert_eq!(reopened.get("auth_token").as_deref(), Some("abc"));

        reopened.remove("auth_token").unwrap();
        drop(reopened);

        let again = FileTokenStorage::open(&path).unwrap();
        assert!(again.get("auth_token").is_none());
        assert_eq!(again.get("refresh_token").as_deref(), Some("def"));
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let storage = FileTokenStorage::open(&path).unwrap();
        storage.set("auth_token", "secret").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let fresh = dir.path().join("fresh.json");
        FileTokenStorage::open(&fresh).unwrap().set("k", "v").unwrap();
        assert_eq!(fs::metadata(&fresh).unwrap().permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            FileTokenStorage::open(&path),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn test_removing_missing_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::open(dir.path().join("t.json")).unwrap();
        assert!(storage.remove("auth_token").is_ok());
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryTokenStorage::new().with("auth_token", "t");
        assert_eq!(storage.get("auth_token").as_deref(), Some("t"));
        storage.remove("auth_token").unwrap();
        assert!(storage.get("auth_token").is_none());
    }
}

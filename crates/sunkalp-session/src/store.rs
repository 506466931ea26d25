//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Key-value persistence for session and connection settings."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Key holding the serialized identity claims.
pub const IDENTITY_KEY: &str = "identity";
/// Key holding the telemetry channel identifier.
pub const CHANNEL_ID_KEY: &str = "channel_id";
/// Key holding the telemetry read API key.
pub const API_KEY_KEY: &str = "api_key";

const STORE_FILE: &str = "session.json";

/// Errors raised by a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper for IO errors encountered while reading/writing the store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON (de)serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key-value storage mirroring the in-memory session.
pub trait KeyValueStore {
    /// Fetch a value.
    fn get(&self, key: &str) -> Option<String>;
    /// Insert or replace a value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Remove a value; removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Volatile store used by tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object at `<dir>/session.json`.
///
/// The whole map is rewritten on every mutation through a temporary file and
/// a rename, so a crash never leaves a truncated file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open (or lazily create) the store inside `directory`.
    ///
    /// A missing or corrupt file yields an empty store; the next write
    /// replaces it. Only IO failures are errors.
    pub fn open(directory: &Path) -> Result<Self, StoreError> {
        let path = directory.join(STORE_FILE);
        let entries = if path.exists() {
            let raw = fs::read(&path)?;
            if raw.iter().all(u8::is_ascii_whitespace) {
                BTreeMap::new()
            } else {
                match serde_json::from_slice(&raw) {
                    Ok(entries) => entries,
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "session file unreadable; starting empty");
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "session store opened");
        Ok(Self { path, entries })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, &self.entries)?;
            writer.flush()?;
        }
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

// The file carries the telemetry API key.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.set(CHANNEL_ID_KEY, "123456").unwrap();
        store.set(API_KEY_KEY, "ABCDEF").unwrap();
        drop(store);

        let mut reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(CHANNEL_ID_KEY).as_deref(), Some("123456"));
        reopened.remove(API_KEY_KEY).unwrap();
        drop(reopened);

        let again = FileStore::open(dir.path()).unwrap();
        assert_eq!(again.get(API_KEY_KEY), None);
        assert_eq!(again.get(CHANNEL_ID_KEY).as_deref(), Some("123456"));
    }

    #[test]
    fn missing_directory_is_created_on_write() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("state").join("sunkalp");
        let mut store = FileStore::open(&nested).unwrap();
        assert!(store.get(IDENTITY_KEY).is_none());
        store.set(IDENTITY_KEY, "{}").unwrap();
        assert!(nested.join("session.json").is_file());
        assert!(!nested.join("session.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_starts_empty_and_is_replaced() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("session.json");
        fs::write(&file, "{not json").unwrap();

        let mut store = FileStore::open(dir.path()).unwrap();
        assert!(store.get(IDENTITY_KEY).is_none());
        store.set(CHANNEL_ID_KEY, "123456").unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(CHANNEL_ID_KEY).as_deref(), Some("123456"));
    }

    #[test]
    fn unreadable_path_is_an_io_error() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("session.json")).unwrap();
        assert!(matches!(FileStore::open(dir.path()), Err(StoreError::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.set(API_KEY_KEY, "secret").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        store.set("a", "1").unwrap();
        assert_eq!(store.len(), 1);
        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert!(store.is_empty());
    }
}

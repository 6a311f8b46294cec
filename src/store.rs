//! Persistence of bridge credentials.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::debug;

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Bridge address to application key.
pub type Credentials = HashMap<String, String>;

/// Where registered credentials are kept between runs.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Credentials>;

    fn save(&self, credentials: &Credentials) -> Result<()>;
}

/// Credentials kept in a JSON object on disk.
///
/// Writes go to a sibling temp file which is synced and then renamed over
/// the target, so a crash never leaves a truncated file behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for JsonFileStore {
    /// A missing file is an empty store.
    fn load(&self) -> Result<Credentials> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Credentials::new()),
            Err(e) => return Err(Error::io("read", e)),
        };
        serde_json::from_slice(&raw).map_err(Error::JsonLoad)
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        let body = serde_json::to_vec_pretty(credentials).map_err(Error::JsonDump)?;
        let tmp = self.path.with_extension("tmp");

        let mut file = fs::File::create(&tmp).map_err(|e| Error::io("create", e))?;
        file.write_all(&body).map_err(|e| Error::io("write", e))?;
        file.sync_all().map_err(|e| Error::io("sync", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::io("rename", e))?;

        debug!(
            "Saved {} bridge credential(s) to {}",
            credentials.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// In-process store, for hosts that persist credentials themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: Mutex<Credentials>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new(credentials: Credentials) -> Self {
        MemoryStore {
            credentials: Mutex::new(credentials),
            saves: Mutex::new(0),
        }
    }

    /// How many times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|s| *s).unwrap_or_default()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Credentials> {
        Ok(self
            .credentials
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default())
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Ok(mut stored) = self.credentials.lock() {
            stored.clone_from(credentials);
        }
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("credentials.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("credentials.json"));
        let creds = Credentials::from([
            ("10.0.0.2".to_string(), "key-a".to_string()),
            ("10.0.0.3".to_string(), "key-b".to_string()),
        ]);

        store.save(&creds).unwrap();
        assert_eq!(store.load().unwrap(), creds);
        assert!(!dir.path().join("credentials.tmp").exists());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(path).load(),
            Err(Error::JsonLoad(_))
        ));
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemoryStore::default();
        store
            .save(&Credentials::from([("a".to_string(), "b".to_string())]))
            .unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().unwrap().len(), 1);
    }
}

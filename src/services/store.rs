// src/services/store.rs
use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::HelperError;
use crate::host::KeyValueStore;

pub const CRAWL_KEY: &str = "petroleumHelperData";
pub const CLAIM_KEY: &str = "petroleumHelperClaimData";
pub const REPORT_KEY: &str = "petroleumHelperCompleteResults";
pub const RELOAD_RETRY_KEY: &str = "petroleumHelperReloadRetry";

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().map_err(|_| io::Error::other("store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().map_err(|_| io::Error::other("store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        // Write aside and rename so a reader never sees half a blob.
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(tmp, self.path_for(key))
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Loads a whole blob. `Ok(None)` when the key is absent.
pub fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, HelperError> {
    let Some(raw) = store.get(key) else {
        return Ok(None);
    };
    serde_json::from_str(&raw).map(Some).map_err(|e| {
        error!("Failed to parse {}: {}", key, e);
        HelperError::CorruptState { key: key.to_string(), reason: e.to_string() }
    })
}

/// Replaces a whole blob.
pub fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), HelperError> {
    let raw = serde_json::to_string(value).map_err(|e| HelperError::CorruptState {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    debug!("Persisting {} ({} bytes)", key, raw.len());
    store.set(key, &raw)?;
    Ok(())
}

pub fn reload_retries(store: &dyn KeyValueStore) -> u32 {
    store.get(RELOAD_RETRY_KEY).and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

pub fn set_reload_retries(store: &dyn KeyValueStore, count: u32) -> Result<(), HelperError> {
    store.set(RELOAD_RETRY_KEY, &count.to_string())?;
    Ok(())
}

pub fn clear_reload_retries(store: &dyn KeyValueStore) {
    if let Err(e) = store.remove(RELOAD_RETRY_KEY) {
        error!("Failed to clear reload retry counter: {}", e);
    }
}

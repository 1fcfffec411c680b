//! Key-value persistence for catalog, favorites and preferences.
//!
//! Values are JSON documents addressed by a string key. `FileStore` keeps one
//! `<key>.json` file per key under a directory; `MemoryStore` backs tests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

pub const KEY_CUSTOM_STATIONS: &str = "my_custom_stations";
pub const KEY_FAVORITES: &str = "my_favorites";
pub const KEY_PREFERENCES: &str = "preferences";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store key '{0}'")]
    InvalidKey(String),

    #[error("malformed value under '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub trait KvStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>>;
    fn set_raw(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Read and decode a JSON value. A missing key yields `Ok(None)`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match store.get_raw(key)? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                key: key.to_string(),
                source,
            }),
    }
}

pub fn save_json<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    store.set_raw(key, &raw)
}

fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KvStore for FileStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        // write-then-rename so a crash never leaves a truncated document
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("kv"));
        assert!(store.get_raw(KEY_FAVORITES).unwrap().is_none());

        save_json(&store, KEY_FAVORITES, &vec!["it-1", "uk-2"]).unwrap();
        let back: Option<Vec<String>> = load_json(&store, KEY_FAVORITES).unwrap();
        assert_eq!(back.unwrap(), vec!["it-1", "uk-2"]);
        assert!(dir.path().join("kv").join("my_favorites.json").exists());

        store.remove(KEY_FAVORITES).unwrap();
        store.remove(KEY_FAVORITES).unwrap();
        assert!(store.get_raw(KEY_FAVORITES).unwrap().is_none());
    }

    #[test]
    fn test_malformed_value_reports_key() {
        let store = MemoryStore::new();
        store.set_raw(KEY_PREFERENCES, "{not json").unwrap();
        let err = load_json::<Vec<String>>(&store, KEY_PREFERENCES).unwrap_err();
        assert!(err.to_string().contains("preferences"));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let store = FileStore::new(std::env::temp_dir());
        assert!(matches!(
            store.get_raw("../etc/passwd"),
            Err(StoreError::InvalidKey(_))
        ));
    }
}

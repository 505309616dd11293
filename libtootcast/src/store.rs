//! Durable key-value storage
//!
//! Sticky preferences, the account identity and the last published status all
//! live behind [`KeyValueStore`]. Values are JSON strings under fixed keys.
//! The store is injected into the services that need it, so tests can swap
//! in a [`MemoryStore`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError, TootcastError};

/// Fixed keys used by the services
pub mod keys {
    pub const ACCOUNT_FQN: &str = "account-fqn";
    pub const LATEST_PUBLISHED_STATUS: &str = "latest_published_status";
    pub const DRAFT_VALUES: &str = "draft-values";
    pub const PREF_VISIBILITY: &str = "preference.visibility";
    pub const PREF_MARKDOWN: &str = "preference.markdown";
    pub const PREF_SENSITIVE: &str = "preference.sensitive";
}

/// String-keyed store of JSON values
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Typed access on top of [`KeyValueStore`]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Read and deserialize a value
    ///
    /// A value that no longer deserializes is reported as an error so the
    /// caller can decide whether to fall back to a default.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| {
                    TootcastError::from(StoreError::Serialization {
                        key: key.to_string(),
                        source,
                    })
                }),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.set(key, &raw)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry, for before/after comparisons
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object file
///
/// The file is created on first write. Every write replaces the file through
/// a temporary sibling and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, loading existing entries
    ///
    /// A corrupted file is logged and treated as empty; it is overwritten on
    /// the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(StoreError::Io)?;
            match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Corrupted store file {}, starting empty: {}", path.display(), e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::Io)?;
        }

        let content = serde_json::to_string_pretty(entries).map_err(|source| {
            StoreError::Serialization {
                key: "*".to_string(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(StoreError::Io)?;
        std::fs::rename(&tmp_path, &self.path).map_err(StoreError::Io)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

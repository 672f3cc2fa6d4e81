//! Key-value persistence for session and activity state.
//!
//! [`MemoryStore`] keeps entries in a map; [`FileStore`] mirrors the map to a
//! JSON document on every write. Values are strings; [`TypedStoreExt`] adds
//! JSON encode/decode on top.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Well-known keys.
pub mod keys {
    pub const WALLET_ADDRESS: &str = "walletAddress";
    pub const USER_PROFILE: &str = "userProfile";
    pub const USER_STOCK_KWH: &str = "userStockKwh";
    pub const TRANSACTION_HISTORY: &str = "transactionHistory";
    pub const COMMUNITY_POOL: &str = "communityPool";
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("cannot access \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store \"{}\" is not a JSON object of strings: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("value under \"{key}\" is not valid JSON: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode value for \"{key}\": {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed, string-valued persistent storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
    fn clear(&mut self) -> Result<(), StorageError>;
}

/// How [`TypedStoreExt::get_json`] treats a value that is not valid JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Return the decode error.
    #[default]
    Fail,
    /// Treat the stored text as a JSON string and decode that instead.
    Raw,
    /// Return `None`.
    Safe,
}

/// JSON accessors for any [`KeyValueStore`].
pub trait TypedStoreExt: KeyValueStore {
    fn get_json<T: DeserializeOwned>(
        &self,
        key: &str,
        mode: RetrievalMode,
    ) -> Result<Option<T>, StorageError> {
        let Some(item) = self.get(key)? else {
            return Ok(None);
        };

        match serde_json::from_str(&item) {
            Ok(value) => Ok(Some(value)),
            Err(source) => match mode {
                RetrievalMode::Safe => Ok(None),
                RetrievalMode::Raw => serde_json::from_value(Value::String(item))
                    .map(Some)
                    .map_err(|source| StorageError::Decode {
                        key: key.to_string(),
                        source,
                    }),
                RetrievalMode::Fail => Err(StorageError::Decode {
                    key: key.to_string(),
                    source,
                }),
            },
        }
    }

    fn set_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set(key, &encoded)
    }
}

impl<S: KeyValueStore + ?Sized> TypedStoreExt for S {}

/// Volatile store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.entries.clear();
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// The whole document is rewritten (via a sibling temp file and rename) on
/// every mutation. No cross-process locking: the last writer wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let entries = match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let encoded = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            StorageError::Encode {
                key: "*".to_string(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encoded).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.entries.clear();
        self.flush()
    }
}

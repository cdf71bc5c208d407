//! String-keyed persistence for cards and study-session state.
//!
//! Every value is stored as JSON text under its own key. The [`Storage`] handle is
//! a best-effort cache: read failures fall back to the caller's default and write
//! failures are logged and dropped, so nothing in here ever reaches the user.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};

/// Key holding the ordered card collection.
pub const CARDS_KEY: &str = "flashmaster-cards";
pub const CURRENT_INDEX_KEY: &str = "study-current-index";
pub const SELECTED_TAG_KEY: &str = "study-selected-tag";
pub const REVIEWED_CARDS_KEY: &str = "study-reviewed-cards";
pub const SHOW_MASTERED_KEY: &str = "study-show-mastered";
pub const SESSION_KEY: &str = "study-session";

/// Raw string-keyed backend. Implementations report failures; [`Storage`] swallows them.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Shared handle over a [`KeyValueStore`].
///
/// Cloning is cheap; the card repository and the study session hold clones of the
/// same handle.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<Mutex<dyn KeyValueStore>>,
}

impl Storage {
    pub fn new<S: KeyValueStore + 'static>(store: S) -> Self {
        Self {
            backend: Arc::new(Mutex::new(store)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Reads and decodes `key`, returning `default` when the key is absent or the
    /// stored text cannot be decoded.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(raw) = self.raw(key) else {
            return default;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to decode stored value for '{}': {}", key, e);
                default
            }
        }
    }

    /// Reads `key` as an untyped JSON value, for callers that decode legacy shapes.
    pub fn load_json(&self, key: &str) -> Option<serde_json::Value> {
        let raw = self.raw(key)?;
        serde_json::from_str(&raw)
            .map_err(|e| warn!("Stored value for '{}' is not valid JSON: {}", key, e))
            .ok()
    }

    /// Encodes and writes `value`. A failed write is logged and dropped.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(StorageError::from)
            .and_then(|text| self.with_backend(|store| store.set(key, &text)));

        match result {
            Ok(()) => debug!("Saved '{}'", key),
            Err(e) => warn!("Failed to save '{}': {}", key, e),
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.with_backend(|store| store.remove(key)) {
            warn!("Failed to remove '{}': {}", key, e);
        }
    }

    /// Stored text for `key`, if any. Read failures are logged and reported as absent.
    pub fn raw(&self, key: &str) -> Option<String> {
        match self.with_backend(|store| store.get(key)) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read '{}': {}", key, e);
                None
            }
        }
    }

    fn with_backend<R>(
        &self,
        f: impl FnOnce(&mut (dyn KeyValueStore + 'static)) -> Result<R, StorageError>,
    ) -> Result<R, StorageError> {
        let mut guard = self.backend.lock().map_err(|_| StorageError::Poisoned)?;
        f(&mut *guard)
    }
}

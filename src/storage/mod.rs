//! Durable key-value storage behind the session store.
//!
//! Backends hold plain strings under well-known keys. Only
//! [`crate::session::SessionStore`] talks to a backend; everything else goes
//! through the store's operations. Absence of a key always means "not set".

mod file;

pub use file::FileStore;

use crate::error::Result;
use std::{
    collections::BTreeMap,
    sync::{Mutex, PoisonError},
};

/// String key-value storage partitioned by API origin.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` when unset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Storage`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns [`crate::Error::Storage`] when the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`; removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns [`crate::Error::Storage`] when the backend cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory backend, used for tests and sessions that must not outlive the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all keys currently set.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

//! File-backed storage: one JSON document per API origin.
//!
//! Writes go to a temporary sibling and are renamed into place so a crash never
//! leaves a half-written document. A document that fails to parse is treated
//! as empty rather than as an error, matching how a browser treats a missing
//! local storage entry.

use super::KeyValueStore;
use crate::error::{Error, Result};
use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tracing::warn;

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    /// Opens (lazily) the document for `origin_key` under `dir`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>, origin_key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{origin_key}.json")),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(Error::Storage(format!(
                    "Failed to read {}: {err}",
                    self.path.display()
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!("ignoring malformed storage file {}: {err}", self.path.display());
                Ok(BTreeMap::new())
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let storage_err =
            |err: std::io::Error| Error::Storage(format!("Failed to write {}: {err}", self.path.display()));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(storage_err)?;
        }

        let payload = serde_json::to_vec_pretty(entries)
            .map_err(|err| Error::Storage(format!("Failed to encode storage: {err}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path).map_err(storage_err)?;
        file.write_all(&payload).map_err(storage_err)?;
        file.sync_all().map_err(storage_err)?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(storage_err)
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        if apply(&mut entries) {
            self.save(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

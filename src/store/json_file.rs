//! JSON File Store
//!
//! Keeps every record in one JSON document and rewrites the whole file on flush.
//!
//! File layout:
//! ```json
//! { "records": { "<key>": "<value as text>" } }
//! ```

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{PersistentStore, StoreValue};
use crate::error::StoreError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Dump {
    #[serde(default)]
    records: BTreeMap<String, String>,
}

// == JSON File Store ==
/// A `PersistentStore` persisted as a single JSON dump on disk.
///
/// The dump is loaded once in [`JsonFileStore::open`]. Updates only touch the
/// in-memory document until [`PersistentStore::flush`] or drop writes it back.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    dump: Mutex<Dump>,
}

impl JsonFileStore {
    // == Constructor ==
    /// Opens the dump at `path`, creating an empty one if the file is missing.
    ///
    /// # Errors
    /// - `StoreError::Parse` if the file exists but is not a valid dump
    /// - `StoreError::Io` if the file cannot be read or created
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let dump = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Dump::default(),
            Ok(contents) => {
                let dump: Dump = serde_json::from_str(&contents)?;
                info!(
                    "Loaded {} records from {}",
                    dump.records.len(),
                    path.display()
                );
                dump
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let dump = Dump::default();
                fs::write(&path, serde_json::to_string_pretty(&dump)?)?;
                info!("Created new store dump at {}", path.display());
                dump
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            dump: Mutex::new(dump),
        })
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.dump.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dump.lock().records.is_empty()
    }

    fn write_dump(&self) -> Result<(), StoreError> {
        let dump = self.dump.lock();
        fs::write(&self.path, serde_json::to_string_pretty(&*dump)?)?;
        debug!(
            "Flushed {} records to {}",
            dump.records.len(),
            self.path.display()
        );
        Ok(())
    }
}

impl<K, V> PersistentStore<K, V> for JsonFileStore
where
    K: Display,
    V: StoreValue,
{
    fn find(&self, key: &K) -> Result<V, StoreError> {
        let dump = self.dump.lock();
        let raw = dump
            .records
            .get(&key.to_string())
            .map(String::as_str)
            .unwrap_or("");
        V::from_store_string(raw)
    }

    fn update(&self, key: &K, value: &V) -> Result<(), StoreError> {
        self.dump
            .lock()
            .records
            .insert(key.to_string(), value.to_store_string());
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.write_dump()
    }
}

impl Drop for JsonFileStore {
    fn drop(&mut self) {
        if let Err(err) = self.write_dump() {
            error!("Failed to write store dump {}: {}", self.path.display(), err);
        }
    }
}

//! Local Store - synchronous durable mirror of the in-memory state.
//!
//! The store keeps three independently keyed entries, one JSON array per
//! collection. Loading tolerates a corrupt or missing entry by substituting
//! an empty collection for that entry only; saving always writes all three.
//!
//! Records inside a readable entry go through the same lenient document
//! codec as remote documents, so one bad record is skipped on its own.

use crate::document::Document;
use crate::manager::Entity;
use crate::{error::Result, AppState, Collection, CollectionName, Error};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Version suffix of the persisted layout.
pub const LAYOUT_VERSION: u32 = 1;

/// Key under which a collection is persisted.
pub fn storage_key(collection: CollectionName) -> String {
    format!("tally_{}_v{}", collection.as_str(), LAYOUT_VERSION)
}

/// A synchronous key-value persistence backend.
pub trait StorageBackend {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> io::Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn write(&mut self, key: &str, value: &str) -> io::Result<()>;
}

/// In-memory backend, for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw access to an entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Overwrite an entry directly, bypassing serialization.
    pub fn insert_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory backend: one `<key>.json` file per entry.
///
/// Writes go to a temporary file first and are renamed into place, so an
/// entry is either the old or the new content, never a torn write.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) a storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
        let target = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &target)
    }
}

/// The Local Store over some backend.
#[derive(Debug, Clone)]
pub struct LocalStore<B> {
    backend: B,
}

impl<B: StorageBackend> LocalStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Load all three collections.
    ///
    /// Never fails: a missing, unreadable or malformed entry yields an empty
    /// collection and the other entries load normally. A record that cannot
    /// be decoded is dropped and the rest of its collection is kept.
    pub fn load_all(&self) -> AppState {
        AppState {
            products: self.load_collection(),
            clients: self.load_collection(),
            orders: self.load_collection(),
        }
    }

    fn load_collection<T: Entity>(&self) -> Collection<T> {
        let collection = T::COLLECTION;
        let key = storage_key(collection);
        let raw = match self.backend.read(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Collection::new(),
            Err(e) => {
                tracing::warn!(collection = %collection, error = %e, "Failed to read local entry");
                return Collection::new();
            }
        };

        let values = match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(
                    collection = %collection,
                    error = %e,
                    "Discarding malformed local entry"
                );
                return Collection::new();
            }
        };

        let records: Vec<T> = values
            .into_iter()
            .filter_map(|value| {
                let decoded = serde_json::from_value::<Document>(value)
                    .map_err(|e| Error::Storage(e.to_string()))
                    .and_then(|doc| T::from_document(&doc));
                match decoded {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!(collection = %collection, error = %e, "Skipping local record");
                        None
                    }
                }
            })
            .collect();
        Collection::from_records(records)
    }

    /// Persist all three collections.
    ///
    /// Everything is serialized before the first write, so a serialization
    /// failure leaves the previous entries untouched.
    pub fn save_all(&mut self, state: &AppState) -> Result<()> {
        let entries = [
            (CollectionName::Products, encode(&state.products)?),
            (CollectionName::Clients, encode(&state.clients)?),
            (CollectionName::Orders, encode(&state.orders)?),
        ];

        for (collection, json) in &entries {
            self.backend
                .write(&storage_key(*collection), json)
                .map_err(|e| Error::Storage(format!("writing {collection}: {e}")))?;
        }
        Ok(())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Storage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Client, Product};
    use rust_decimal::Decimal;

    fn sample_state() -> AppState {
        let mut state = AppState::new();
        state.products.upsert(Product {
            id: "prod_1".into(),
            name: "Sod".into(),
            price: Decimal::new(1250, 2),
        });
        state.clients.upsert(Client {
            id: "cli_1".into(),
            name: "Ana".into(),
            phone: "555".into(),
        });
        state
    }

    #[test]
    fn empty_backend_loads_empty_state() {
        let store = LocalStore::new(MemoryBackend::new());
        assert_eq!(store.load_all(), AppState::new());
    }

    #[test]
    fn save_then_load() {
        let mut store = LocalStore::new(MemoryBackend::new());
        let state = sample_state();
        store.save_all(&state).unwrap();
        assert_eq!(store.load_all(), state);
    }

    #[test]
    fn save_writes_all_three_entries() {
        let mut store = LocalStore::new(MemoryBackend::new());
        store.save_all(&AppState::new()).unwrap();
        for collection in CollectionName::ALL {
            assert_eq!(store.backend().get(&storage_key(collection)), Some("[]"));
        }
    }

    #[test]
    fn malformed_entry_only_resets_that_collection() {
        let mut store = LocalStore::new(MemoryBackend::new());
        store.save_all(&sample_state()).unwrap();
        store
            .backend_mut()
            .insert_raw(storage_key(CollectionName::Clients), "{not json");

        let loaded = store.load_all();
        assert!(loaded.clients.is_empty());
        assert_eq!(loaded.products.len(), 1);
    }

    #[test]
    fn bad_record_is_skipped_not_the_collection() {
        let mut store = LocalStore::new(MemoryBackend::new());
        store.save_all(&sample_state()).unwrap();
        store.backend_mut().insert_raw(
            storage_key(CollectionName::Orders),
            r#"[
                {"id": "order_bad", "date": "2024-01-01", "items": "nope"},
                {"id": "order_ok", "date": "2024-01-01", "time": "09:30",
                 "items": [{"id": "prod_1", "name": "Sod", "price": 2.5, "qty": 2}],
                 "paymentMethod": "cash", "paid": true, "total": 5.0},
                42
            ]"#,
        );

        let loaded = store.load_all();
        assert_eq!(loaded.orders.len(), 1);
        let order = loaded.orders.get("order_ok").unwrap();
        assert_eq!(order.items[0].qty, 2);
        assert_eq!(order.total, Decimal::new(5, 0));
        assert_eq!(loaded.products.len(), 1);
    }

    #[test]
    fn storage_keys_are_distinct() {
        let keys: std::collections::HashSet<_> =
            CollectionName::ALL.iter().map(|c| storage_key(*c)).collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(storage_key(CollectionName::Orders), "tally_orders_v1");
    }
}

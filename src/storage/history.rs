use crate::storage::kv::{KeyValueStore, MemoryStore};
use crate::storage::run_record::RunRecord;
use crate::storage::StorageError;

/// Key the run history is stored under.
pub const HISTORY_KEY: &str = "stress-test-history";

/// Narrow persistence interface the engine is injected with.
pub trait HistoryStore {
    /// Stored history, newest first. A store with nothing saved yields an
    /// empty list.
    fn load_history(&self) -> Result<Vec<RunRecord>, StorageError>;
    fn save_history(&mut self, history: &[RunRecord]) -> Result<(), StorageError>;
    fn clear_history(&mut self) -> Result<(), StorageError>;
}

/// History as one JSON array under a single key of a [`KeyValueStore`].
///
/// The document is parsed all-or-nothing: one malformed entry makes the
/// whole value [`StorageError::Corrupt`].
#[derive(Debug, Clone)]
pub struct KvHistoryStore<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> KvHistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, HISTORY_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

impl KvHistoryStore<MemoryStore> {
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: KeyValueStore> HistoryStore for KvHistoryStore<S> {
    fn load_history(&self) -> Result<Vec<RunRecord>, StorageError> {
        match self.store.get(&self.key)? {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                key: self.key.clone(),
                source,
            }),
        }
    }

    fn save_history(&mut self, history: &[RunRecord]) -> Result<(), StorageError> {
        let json = serde_json::to_string(history).map_err(StorageError::Serialize)?;
        self.store.set(&self.key, &json)
    }

    fn clear_history(&mut self) -> Result<(), StorageError> {
        self.store.remove(&self.key)
    }
}

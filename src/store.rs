//! Key-value store abstraction for persisted values.
//!
//! The memory game keeps its best completion time across sessions. Where that
//! value lives (browser local storage, a settings file, a database row) is the
//! host's concern; the game only needs string get/set semantics.

use crate::error::StoreError;
use std::collections::HashMap;

/// Storage key for the best completion time, in whole seconds.
pub const BEST_TIME_KEY: &str = "bestTime";

/// String key-value storage seam.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store for hosts without durable storage and for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Read the stored best time, if any.
pub fn load_best_time(store: &dyn KeyValueStore) -> Result<Option<u64>, StoreError> {
    match store.get(BEST_TIME_KEY)? {
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| StoreError::CorruptValue {
                key: BEST_TIME_KEY.to_string(),
                value: raw,
            }),
        None => Ok(None),
    }
}

/// Persist a new best time.
pub fn save_best_time(store: &mut dyn KeyValueStore, seconds: u64) -> Result<(), StoreError> {
    store.set(BEST_TIME_KEY, &seconds.to_string())
}

//! Key-value durable storage abstraction
//!
//! The source document and the preferences round-trip through a flat
//! string-to-string store. The editing surface loads it once at startup and
//! writes on every relevant change.

use crate::error::Result;
use std::collections::BTreeMap;

/// A simple durable key-value store.
pub trait KeyValueStore {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, persisting it.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a value, persisting the removal.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store, used for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

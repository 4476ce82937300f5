use crate::error::PersistError;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// External key-value storage that persisted fields load from and save to.
///
/// Values travel as JSON so one backend can hold fields of any
/// serializable type.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueBackend: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>, PersistError>;

    fn save(&self, key: &str, value: Value) -> Result<(), PersistError>;
}

/// Process-local backend backed by a map.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an entry, as if saved by an earlier session.
    pub fn with_entry(self, key: impl Into<String>, value: Value) -> Self {
        self.entries.write().insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<Value>, PersistError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, value: Value) -> Result<(), PersistError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }
}

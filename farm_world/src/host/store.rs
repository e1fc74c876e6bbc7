//! In-memory persistent store.

use std::collections::HashMap;

use super::{HostError, PersistentStore, Scope};

/// A [`PersistentStore`] backed by a map, for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<(Scope, String), String>,
    /// When set, every write is rejected.
    pub read_only: bool,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a raw value without a default.
    pub fn get(&self, key: &str, scope: Scope) -> Option<&str> {
        self.values.get(&(scope, key.to_string())).map(String::as_str)
    }

    /// Number of stored keys across both scopes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PersistentStore for MemoryStore {
    fn get_persistent(&self, key: &str, default: &str, scope: Scope) -> String {
        self.get(key, scope).unwrap_or(default).to_string()
    }

    fn save_persistent(&mut self, key: &str, value: &str, scope: Scope) -> Result<(), HostError> {
        if self.read_only {
            return Err(HostError::Rejected(format!("store is read-only, cannot write {key}")));
        }
        self.values
            .insert((scope, key.to_string()), value.to_string());
        Ok(())
    }
}

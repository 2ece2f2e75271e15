//! In-memory storage.
//!
//! Projects are kept as encoded JSON, the same form `FileStorage` writes, so
//! a save that could not be reloaded from disk fails here too and loaded
//! projects never alias the caller's copy.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::model::SavedProject;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Ephemeral storage for tests and sessions without a data directory.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored projects, including the last-project marker if set.
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, project: &SavedProject) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let encoded = serde_json::to_string(project);
        Box::pin(async move {
            let json = encoded.map_err(|e| StorageError::Serialization(e.to_string()))?;
            self.entries.write().map_err(poisoned)?.insert(id, json);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<SavedProject>> {
        let id = id.to_string();
        Box::pin(async move {
            let entries = self.entries.read().map_err(poisoned)?;
            let json = entries.get(&id).ok_or_else(|| StorageError::NotFound(id.clone()))?;
            serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            self.entries.write().map_err(poisoned)?.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move { Ok(self.entries.read().map_err(poisoned)?.keys().cloned().collect()) })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.entries.read().map_err(poisoned)?.contains_key(&id)) })
    }
}

//! In-memory adapter. The fallback when no backend is configured.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::{Adapter, AdapterEntry, StoredValue};
use crate::error::{BackendError, EndbResult};
use crate::namespace::{DEFAULT_NAMESPACE, in_namespace};

const NAME: &str = "memory";

fn lock_err(e: impl std::fmt::Display) -> BackendError {
    BackendError::new(NAME, e.to_string())
}

/// In-memory adapter backed by an ordered map.
///
/// Clones share the same map, so several stores with different namespaces
/// can sit on one physical backend.
///
/// # Example
///
/// ```rust,ignore
/// use endb::{Endb, MemoryAdapter};
///
/// let shared = MemoryAdapter::new();
/// let users = Endb::builder().namespace("users").store(shared.clone()).build()?;
/// let cache = Endb::builder().namespace("cache").store(shared).build()?;
/// ```
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    data: Arc<RwLock<BTreeMap<String, StoredValue>>>,
    namespace: String,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self {
            data: Arc::default(),
            namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }
}

impl MemoryAdapter {
    /// Create a new empty in-memory adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already-decoded value under a raw (prefixed) key.
    ///
    /// The store returns such values as-is instead of running them through
    /// its codec.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the map lock is poisoned.
    pub fn insert_value(&self, key: impl Into<String>, value: Value) -> EndbResult<()> {
        let mut data = self.data.write().map_err(lock_err)?;
        data.insert(key.into(), StoredValue::Decoded(value));
        Ok(())
    }

    /// Number of entries across all namespaces.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the map lock is poisoned.
    pub fn len(&self) -> EndbResult<usize> {
        Ok(self.data.read().map_err(lock_err)?.len())
    }

    /// Whether the map holds no entries in any namespace.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the map lock is poisoned.
    pub fn is_empty(&self) -> EndbResult<bool> {
        self.len().map(|n| n == 0)
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn set_namespace(&mut self, namespace: &str) {
        namespace.clone_into(&mut self.namespace);
    }

    async fn all(&self) -> EndbResult<Vec<AdapterEntry>> {
        let data = self.data.read().map_err(lock_err)?;
        Ok(data
            .iter()
            .filter(|(key, _)| in_namespace(&self.namespace, key))
            .map(|(key, value)| AdapterEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    async fn clear(&self) -> EndbResult<()> {
        let mut data = self.data.write().map_err(lock_err)?;
        data.retain(|key, _| !in_namespace(&self.namespace, key));
        Ok(())
    }

    async fn delete(&self, key: &str) -> EndbResult<bool> {
        let mut data = self.data.write().map_err(lock_err)?;
        Ok(data.remove(key).is_some())
    }

    async fn get(&self, key: &str) -> EndbResult<Option<StoredValue>> {
        let data = self.data.read().map_err(lock_err)?;
        Ok(data.get(key).cloned())
    }

    async fn has(&self, key: &str) -> EndbResult<bool> {
        let data = self.data.read().map_err(lock_err)?;
        Ok(data.contains_key(key))
    }

    async fn set(&self, key: &str, value: String) -> EndbResult<()> {
        let mut data = self.data.write().map_err(lock_err)?;
        data.insert(key.to_owned(), StoredValue::Encoded(value));
        Ok(())
    }
}

//! The public store facade.
//!
//! [`Endb`] composes the pieces of the crate: it resolves a backend, prefixes
//! every key with its namespace, runs values through the codec, and forwards
//! backend error reports to its subscribers.
//!
//! # Path access
//!
//! The `*_at` methods read or write a field nested inside a stored value. The
//! writes are fetch-modify-write sequences with no locking: two concurrent
//! path writes to the same key can lose one update.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::adapter::{Adapter, MemoryAdapter, StoredValue};
use crate::codec::{Codec, JsonCodec};
use crate::error::{EndbError, EndbResult};
use crate::events::{DEFAULT_CHANNEL_CAPACITY, ErrorSink, EventReceiver, StoreEvent};
use crate::namespace::{self, DEFAULT_NAMESPACE};
use crate::options::{StoreBuilder, StoreOptions};
use crate::{path, resolver};

/// A key and its decoded value, as returned by [`Endb::all`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// The logical key, without namespace.
    pub key: String,
    /// The decoded value.
    pub value: Value,
}

/// Key-value store facade over a pluggable backend.
///
/// # Example
///
/// ```rust,ignore
/// use endb::Endb;
/// use serde_json::json;
///
/// let store = Endb::new();
/// store.set("a", &json!({"x": 1})).await?;
/// store.set_at("a", &2, "x").await?;
/// assert_eq!(store.get("a").await?, Some(json!({"x": 2})));
/// assert_eq!(store.get_at("a", "x").await?, Some(json!(2)));
/// ```
pub struct Endb {
    adapter: Box<dyn Adapter>,
    namespace: String,
    codec: Arc<dyn Codec>,
    events: broadcast::Sender<StoreEvent>,
    forwards_errors: bool,
}

impl std::fmt::Debug for Endb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endb")
            .field("adapter", &self.adapter.name())
            .field("namespace", &self.namespace)
            .field("forwards_errors", &self.forwards_errors)
            .finish_non_exhaustive()
    }
}

impl Default for Endb {
    fn default() -> Self {
        Self::new()
    }
}

impl Endb {
    /// Create an in-memory store in the default namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::assemble(
            Box::new(MemoryAdapter::new()),
            DEFAULT_NAMESPACE.to_owned(),
            Arc::new(JsonCodec),
        )
    }

    /// Create a store from a connection string such as `sqlite://data.db`.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Configuration`] if no usable adapter matches the
    /// connection string.
    pub fn connect(uri: &str) -> EndbResult<Self> {
        Self::with_options(StoreOptions::from(uri))
    }

    /// Start building a store.
    #[must_use]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// Create a store from options.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Configuration`] if the backend cannot be resolved.
    pub fn with_options(mut options: StoreOptions) -> EndbResult<Self> {
        let adapter = resolver::resolve(&mut options)?;
        Ok(Self::assemble(adapter, options.namespace, options.codec))
    }

    fn assemble(mut adapter: Box<dyn Adapter>, namespace: String, codec: Arc<dyn Codec>) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        let forwards_errors = adapter.attach_error_sink(ErrorSink::new(events.clone()));
        adapter.set_namespace(&namespace);
        debug!(
            adapter = adapter.name(),
            namespace = %namespace,
            forwards_errors,
            "store ready"
        );
        Self {
            adapter,
            namespace,
            codec,
            events,
            forwards_errors,
        }
    }

    // -- Accessors --

    /// The namespace keys are prefixed with.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Re-scope the store to another namespace.
    ///
    /// Keys written under the previous namespace stay in the backend but are
    /// no longer reachable through this store.
    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = namespace.into();
        self.adapter.set_namespace(&self.namespace);
        debug!(namespace = %self.namespace, "namespace changed");
    }

    /// The resolved backend.
    #[must_use]
    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    /// Name of the resolved backend.
    #[must_use]
    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }

    /// Whether the backend reports its failures on the event channel.
    #[must_use]
    pub fn forwards_errors(&self) -> bool {
        self.forwards_errors
    }

    /// Subscribe to store events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.events.subscribe())
    }

    // -- Internals --

    fn add_prefix(&self, key: &str) -> String {
        namespace::add_prefix(&self.namespace, key)
    }

    fn remove_prefix(&self, key: &str) -> String {
        namespace::remove_prefix(&self.namespace, key)
    }

    fn decode(&self, stored: StoredValue) -> EndbResult<Value> {
        match stored {
            StoredValue::Encoded(text) => self.codec.deserialize(&text),
            StoredValue::Decoded(value) => Ok(value),
        }
    }

    async fn write(&self, key: &str, value: &Value) -> EndbResult<bool> {
        let prefixed = self.add_prefix(key);
        let encoded = self.codec.serialize(value)?;
        trace!(key = %prefixed, "set");
        self.adapter.set(&prefixed, encoded).await?;
        Ok(true)
    }

    // -- Operations --

    /// Every entry in the namespace, with keys stripped of the namespace.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the bulk read fails, or
    /// [`EndbError::Serialization`] if a value cannot be decoded.
    pub async fn all(&self) -> EndbResult<Vec<Element>> {
        trace!(namespace = %self.namespace, "all");
        self.adapter
            .all()
            .await?
            .into_iter()
            .map(|entry| -> EndbResult<Element> {
                Ok(Element {
                    key: self.remove_prefix(&entry.key),
                    value: self.decode(entry.value)?,
                })
            })
            .collect()
    }

    /// Remove every entry in the backend's namespace scope.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the backend fails.
    pub async fn clear(&self) -> EndbResult<()> {
        trace!(namespace = %self.namespace, "clear");
        self.adapter.clear().await
    }

    /// Delete a key. Returns `true` if the key existed.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the backend fails.
    pub async fn delete(&self, key: &str) -> EndbResult<bool> {
        let prefixed = self.add_prefix(key);
        trace!(key = %prefixed, "delete");
        self.adapter.delete(&prefixed).await
    }

    /// Remove the field at `path` inside the value stored under `key`.
    ///
    /// The mutated value is written back even when the key did not exist,
    /// leaving an empty object. Returns `true` once written.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::InvalidPath`] for a malformed path, or any error
    /// from the read or the write.
    pub async fn delete_at(&self, key: &str, path: &str) -> EndbResult<bool> {
        let mut data = path::or_empty(self.get(key).await?);
        path::unset(&mut data, path)?;
        self.write(key, &data).await
    }

    /// Every `(key, value)` pair in the namespace.
    ///
    /// # Errors
    ///
    /// Same as [`all`](Self::all).
    pub async fn entries(&self) -> EndbResult<Vec<(String, Value)>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .map(|element| (element.key, element.value))
            .collect())
    }

    /// Get the decoded value for `key`. Returns `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the backend fails, or
    /// [`EndbError::Serialization`] if the stored value cannot be decoded.
    pub async fn get(&self, key: &str) -> EndbResult<Option<Value>> {
        let prefixed = self.add_prefix(key);
        trace!(key = %prefixed, "get");
        self.adapter
            .get(&prefixed)
            .await?
            .map(|stored| self.decode(stored))
            .transpose()
    }

    /// Get the field at `path` inside the value stored under `key`.
    ///
    /// Returns `None` if the key or any path segment is absent.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::InvalidPath`] for a malformed path, or any error
    /// from [`get`](Self::get).
    pub async fn get_at(&self, key: &str, path: &str) -> EndbResult<Option<Value>> {
        let Some(value) = self.get(key).await? else {
            return Ok(None);
        };
        Ok(path::get(&value, path)?.cloned())
    }

    /// Get the value for `key` deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Serialization`] if the value does not fit `T`, or
    /// any error from [`get`](Self::get).
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> EndbResult<Option<T>> {
        self.get(key)
            .await?
            .map(|value| {
                serde_json::from_value(value).map_err(|e| EndbError::Serialization(e.to_string()))
            })
            .transpose()
    }

    /// Whether `key` exists.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the backend fails.
    pub async fn has(&self, key: &str) -> EndbResult<bool> {
        let prefixed = self.add_prefix(key);
        trace!(key = %prefixed, "has");
        self.adapter.has(&prefixed).await
    }

    /// Whether a field exists at `path` inside the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::InvalidPath`] for a malformed path, or any error
    /// from [`get`](Self::get).
    pub async fn has_at(&self, key: &str, path: &str) -> EndbResult<bool> {
        let data = path::or_empty(self.get(key).await?);
        path::has(&data, path)
    }

    /// Every key in the namespace.
    ///
    /// # Errors
    ///
    /// Same as [`all`](Self::all).
    pub async fn keys(&self) -> EndbResult<Vec<String>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .map(|element| element.key)
            .collect())
    }

    /// Store `value` under `key`. Returns `true`; failures surface as errors.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Serialization`] if the value cannot be encoded, or
    /// a backend error if the write fails.
    pub async fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> EndbResult<bool> {
        let value = to_value(value)?;
        self.write(key, &value).await
    }

    /// Store `value` at `path` inside the value stored under `key`.
    ///
    /// Sibling fields are preserved and intermediate containers created. A
    /// missing key starts from an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::InvalidPath`] for a malformed path, or any error
    /// from the read or the write.
    pub async fn set_at<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        path: &str,
    ) -> EndbResult<bool> {
        let value = to_value(value)?;
        let mut data = path::or_empty(self.get(key).await?);
        path::set(&mut data, path, value)?;
        self.write(key, &data).await
    }

    /// Every value in the namespace.
    ///
    /// # Errors
    ///
    /// Same as [`all`](Self::all).
    pub async fn values(&self) -> EndbResult<Vec<Value>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .map(|element| element.value)
            .collect())
    }
}

fn to_value<V: Serialize + ?Sized>(value: &V) -> EndbResult<Value> {
    serde_json::to_value(value).map_err(|e| EndbError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_new_store_is_memory_in_default_namespace() {
        let store = Endb::new();
        assert_eq!(store.adapter_name(), "memory");
        assert_eq!(store.namespace(), "endb");
        assert_eq!(store.adapter().namespace(), "endb");
        assert!(!store.forwards_errors());
    }

    #[tokio::test]
    async fn test_values_are_encoded_in_backend() {
        let shared = MemoryAdapter::new();
        let store = Endb::builder().store(shared.clone()).build().unwrap();
        store.set("k", &json!({"x": 1})).await.unwrap();
        assert_eq!(
            shared.get("endb:k").await.unwrap(),
            Some(StoredValue::Encoded(r#"{"x":1}"#.into()))
        );
    }

    #[tokio::test]
    async fn test_decoded_backend_values_pass_through() {
        let shared = MemoryAdapter::new();
        shared.insert_value("endb:raw", json!([1, 2])).unwrap();
        let store = Endb::builder().store(shared).build().unwrap();
        assert_eq!(store.get("raw").await.unwrap(), Some(json!([1, 2])));
        assert_eq!(store.values().await.unwrap(), vec![json!([1, 2])]);
    }

    #[tokio::test]
    async fn test_undecodable_value_is_serialization_error() {
        let shared = MemoryAdapter::new();
        shared.set("endb:bad", "{oops".into()).await.unwrap();
        let store = Endb::builder().store(shared).build().unwrap();
        assert!(matches!(
            store.get("bad").await,
            Err(EndbError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_set_at_on_falsy_value_starts_fresh() {
        let store = Endb::new();
        store.set("n", &0).await.unwrap();
        store.set_at("n", &"v", "a").await.unwrap();
        assert_eq!(store.get("n").await.unwrap(), Some(json!({"a": "v"})));
    }

    #[tokio::test]
    async fn test_set_at_on_scalar_value_keeps_it() {
        let store = Endb::new();
        store.set("n", &5).await.unwrap();
        assert!(store.set_at("n", &"v", "a").await.unwrap());
        assert_eq!(store.get("n").await.unwrap(), Some(json!(5)));
    }

    #[tokio::test]
    async fn test_invalid_path_is_reported() {
        let store = Endb::new();
        store.set("k", &json!({})).await.unwrap();
        assert!(matches!(
            store.get_at("k", "a[0").await,
            Err(EndbError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_set_namespace_orphans_old_keys() {
        let shared = MemoryAdapter::new();
        let mut store = Endb::builder().store(shared.clone()).build().unwrap();
        store.set("k", &1).await.unwrap();

        store.set_namespace("other");
        assert_eq!(store.adapter().namespace(), "other");
        assert!(!store.has("k").await.unwrap());
        assert!(store.all().await.unwrap().is_empty());
        // Still physically present under the old namespace.
        assert!(shared.has("endb:k").await.unwrap());
    }
}

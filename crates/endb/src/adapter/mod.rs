//! Backend capability trait and bundled adapters.
//!
//! The [`Adapter`] trait is the only way the store talks to a backend. Keys
//! passed to an adapter are already namespace-prefixed (`"{namespace}:{key}"`)
//! and values are already encoded; the adapter stores them verbatim.
//!
//! - **In-memory** (always available): [`MemoryAdapter`]
//! - **`SQLite`** (behind `sqlite` feature): [`SqliteAdapter`]
//! - **`SurrealKV`** (behind `kv` feature): [`SurrealKvAdapter`]
//!
//! # Namespace scope
//!
//! The store assigns its namespace to the adapter once at construction.
//! Adapters use it to scope [`all`](Adapter::all) and
//! [`clear`](Adapter::clear) to keys under `"{namespace}:"`.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EndbResult;
use crate::events::ErrorSink;

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "kv")]
mod surreal;

pub use memory::MemoryAdapter;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteAdapter;
#[cfg(feature = "kv")]
pub use surreal::SurrealKvAdapter;

/// A value as held by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// Text produced by the store's codec. Decoded on read.
    Encoded(String),
    /// An already-decoded value. Returned to callers untouched.
    Decoded(Value),
}

/// One entry returned by [`Adapter::all`].
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterEntry {
    /// The namespace-prefixed key.
    pub key: String,
    /// The stored value.
    pub value: StoredValue,
}

/// Backend capability consumed by the store.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Short backend name used in logs and errors (e.g. `"memory"`).
    fn name(&self) -> &str;

    /// The namespace this adapter is scoped to.
    fn namespace(&self) -> &str;

    /// Re-scope the adapter to `namespace`.
    fn set_namespace(&mut self, namespace: &str);

    /// Accept the store's error channel.
    ///
    /// Adapters that can report failures on their own keep the sink and
    /// return `true`. The default implementation declines.
    fn attach_error_sink(&mut self, _sink: ErrorSink) -> bool {
        false
    }

    /// Every entry in the adapter's namespace scope.
    async fn all(&self) -> EndbResult<Vec<AdapterEntry>>;

    /// Remove every entry in the adapter's namespace scope.
    async fn clear(&self) -> EndbResult<()>;

    /// Delete a key. Returns `true` if the key existed.
    async fn delete(&self, key: &str) -> EndbResult<bool>;

    /// Get a stored value. Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> EndbResult<Option<StoredValue>>;

    /// Check if a key exists.
    async fn has(&self, key: &str) -> EndbResult<bool>;

    /// Store an encoded value, overwriting any existing value.
    async fn set(&self, key: &str, value: String) -> EndbResult<()>;
}

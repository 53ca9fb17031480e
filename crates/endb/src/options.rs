//! Store construction options.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adapter::Adapter;
use crate::codec::{Codec, JsonCodec};
use crate::error::EndbResult;
use crate::namespace::DEFAULT_NAMESPACE;
use crate::resolver::AdapterRegistry;
use crate::store::Endb;

/// Everything needed to construct an [`Endb`].
///
/// A bare connection string converts into options with only `uri` set.
pub struct StoreOptions {
    /// Namespace prefixed to every key. Defaults to `"endb"`.
    pub namespace: String,
    /// Explicit adapter name (see [`AdapterKind`](crate::AdapterKind)).
    pub adapter: Option<String>,
    /// Connection string. Its scheme names the adapter when `adapter` is unset.
    pub uri: Option<String>,
    /// Table or collection name for adapters that use one.
    pub table: Option<String>,
    /// A ready-made adapter. Bypasses name and URI resolution.
    pub store: Option<Box<dyn Adapter>>,
    /// Value codec. Defaults to [`JsonCodec`].
    pub codec: Arc<dyn Codec>,
    /// Factories used to construct named adapters.
    pub registry: AdapterRegistry,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            adapter: None,
            uri: None,
            table: None,
            store: None,
            codec: Arc::new(JsonCodec),
            registry: AdapterRegistry::default(),
        }
    }
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("namespace", &self.namespace)
            .field("adapter", &self.adapter)
            .field("uri", &self.uri)
            .field("table", &self.table)
            .field("store", &self.store.as_ref().map(|s| s.name().to_owned()))
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl From<&str> for StoreOptions {
    fn from(uri: &str) -> Self {
        Self {
            uri: Some(uri.to_owned()),
            ..Self::default()
        }
    }
}

impl From<String> for StoreOptions {
    fn from(uri: String) -> Self {
        Self {
            uri: Some(uri),
            ..Self::default()
        }
    }
}

impl From<StoreConfig> for StoreOptions {
    fn from(config: StoreConfig) -> Self {
        Self {
            namespace: config.namespace,
            adapter: config.adapter,
            uri: config.uri,
            table: config.table,
            ..Self::default()
        }
    }
}

/// The serializable subset of [`StoreOptions`], for config files.
///
/// ```toml
/// namespace = "sessions"
/// uri = "sqlite://./data/endb.sqlite"
/// table = "kv"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Namespace prefixed to every key.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Explicit adapter name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
    /// Connection string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Table or collection name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_owned()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            adapter: None,
            uri: None,
            table: None,
        }
    }
}

/// Builder for [`Endb`].
///
/// # Example
///
/// ```rust,ignore
/// use endb::Endb;
///
/// let store = Endb::builder()
///     .namespace("sessions")
///     .uri("sqlite://./sessions.db")
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct StoreBuilder {
    options: StoreOptions,
}

impl StoreBuilder {
    /// Start from existing options.
    #[must_use]
    pub fn from_options(options: StoreOptions) -> Self {
        Self { options }
    }

    /// Set the namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.options.namespace = namespace.into();
        self
    }

    /// Select an adapter by name.
    #[must_use]
    pub fn adapter(mut self, adapter: impl Into<String>) -> Self {
        self.options.adapter = Some(adapter.into());
        self
    }

    /// Set the connection string.
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.options.uri = Some(uri.into());
        self
    }

    /// Set the table or collection name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.options.table = Some(table.into());
        self
    }

    /// Use a ready-made adapter.
    #[must_use]
    pub fn store(mut self, store: impl Adapter + 'static) -> Self {
        self.options.store = Some(Box::new(store));
        self
    }

    /// Use a custom codec.
    #[must_use]
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.options.codec = Arc::new(codec);
        self
    }

    /// Use a custom adapter registry.
    #[must_use]
    pub fn registry(mut self, registry: AdapterRegistry) -> Self {
        self.options.registry = registry;
        self
    }

    /// Construct the store.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Configuration`](crate::EndbError::Configuration)
    /// if the backend cannot be resolved.
    pub fn build(self) -> EndbResult<Endb> {
        Endb::with_options(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = StoreOptions::default();
        assert_eq!(options.namespace, "endb");
        assert!(options.adapter.is_none());
        assert!(options.uri.is_none());
        assert!(options.store.is_none());
    }

    #[test]
    fn test_from_connection_string() {
        let options = StoreOptions::from("redis://localhost:6379");
        assert_eq!(options.uri.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(options.namespace, "endb");
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{"uri": "sqlite://x.db"}"#).unwrap();
        assert_eq!(config.namespace, "endb");
        assert_eq!(config.uri.as_deref(), Some("sqlite://x.db"));

        let options = StoreOptions::from(config);
        assert_eq!(options.uri.as_deref(), Some("sqlite://x.db"));
    }

    #[test]
    fn test_builder_sets_fields() {
        let builder = StoreBuilder::default()
            .namespace("ns")
            .adapter("sqlite")
            .uri("sqlite://x.db")
            .table("kv");
        assert_eq!(builder.options.namespace, "ns");
        assert_eq!(builder.options.adapter.as_deref(), Some("sqlite"));
        assert_eq!(builder.options.table.as_deref(), Some("kv"));
    }
}

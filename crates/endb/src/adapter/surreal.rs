//! `SurrealKV` adapter.
//!
//! ACID-compliant, versioned, embedded LSM-tree storage. Keys are stored as
//! the UTF-8 bytes of `"{namespace}:{key}"`, so a namespace occupies the byte
//! range `["{namespace}:", "{namespace};")`.

use async_trait::async_trait;

use super::{Adapter, AdapterEntry, StoredValue};
use crate::error::{BackendError, EndbError, EndbResult};
use crate::events::ErrorSink;
use crate::namespace::DEFAULT_NAMESPACE;

const NAME: &str = "surrealkv";

/// Persistent adapter backed by `SurrealKV`.
///
/// # Example
///
/// ```rust,ignore
/// use endb::{Endb, SurrealKvAdapter};
///
/// let store = Endb::builder()
///     .store(SurrealKvAdapter::open("./data/kv")?)
///     .build()?;
/// ```
pub struct SurrealKvAdapter {
    tree: surrealkv::Tree,
    namespace: String,
    sink: Option<ErrorSink>,
}

impl std::fmt::Debug for SurrealKvAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealKvAdapter")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl SurrealKvAdapter {
    /// Open a store at the given directory path, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Configuration`] if the store cannot be opened.
    pub fn open(path: impl AsRef<std::path::Path>) -> EndbResult<Self> {
        let tree = surrealkv::TreeBuilder::new()
            .with_path(path.as_ref().to_path_buf())
            .build()
            .map_err(|e| EndbError::Configuration(format!("surrealkv open failed: {e}")))?;
        Ok(Self {
            tree,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            sink: None,
        })
    }

    /// Open the store named by a `surrealkv://dir` connection string.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Configuration`] if the connection string has no
    /// path or the store cannot be opened.
    pub fn from_uri(uri: &str) -> EndbResult<Self> {
        let rest = uri.strip_prefix("surrealkv:").ok_or_else(|| {
            EndbError::Configuration(format!("not a surrealkv connection string: {uri:?}"))
        })?;
        let path = rest.strip_prefix("//").unwrap_or(rest);
        if path.is_empty() {
            return Err(EndbError::Configuration(format!(
                "surrealkv connection string has no path: {uri:?}"
            )));
        }
        Self::open(path)
    }

    /// Close the store, flushing any pending writes.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the flush fails.
    pub async fn close(&self) -> EndbResult<()> {
        self.tree.close().await.map_err(|ref e| self.fail(e))
    }

    /// Record a failure on the error channel and convert it.
    fn fail(&self, e: &surrealkv::Error) -> EndbError {
        let error = BackendError::new(NAME, e.to_string());
        if let Some(sink) = &self.sink {
            sink.emit(error.clone());
        }
        EndbError::Backend(error)
    }

    /// Byte range `[start, end)` covering the current namespace.
    fn namespace_range(&self) -> (Vec<u8>, Vec<u8>) {
        let mut start = self.namespace.as_bytes().to_vec();
        let mut end = start.clone();
        start.push(b':');
        end.push(b';');
        (start, end)
    }
}

#[async_trait]
impl Adapter for SurrealKvAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn set_namespace(&mut self, namespace: &str) {
        namespace.clone_into(&mut self.namespace);
    }

    fn attach_error_sink(&mut self, sink: ErrorSink) -> bool {
        self.sink = Some(sink);
        true
    }

    async fn all(&self) -> EndbResult<Vec<AdapterEntry>> {
        let (start, end) = self.namespace_range();
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| self.fail(e))?;

        // The iterator borrows the transaction; values are read afterwards
        // from the same snapshot.
        let keys = {
            let mut iter = tx.range(&start, &end).map_err(|ref e| self.fail(e))?;
            iter.seek_first().map_err(|ref e| self.fail(e))?;
            let mut keys = Vec::new();
            while iter.valid() {
                keys.push(iter.key().to_vec());
                iter.next().map_err(|ref e| self.fail(e))?;
            }
            keys
        };

        let mut entries = Vec::with_capacity(keys.len());
        for raw_key in keys {
            let Some(raw_value) = tx.get(&raw_key).map_err(|ref e| self.fail(e))? else {
                continue;
            };
            let key = String::from_utf8(raw_key)
                .map_err(|e| EndbError::Serialization(e.to_string()))?;
            let value = String::from_utf8(raw_value)
                .map_err(|e| EndbError::Serialization(e.to_string()))?;
            entries.push(AdapterEntry {
                key,
                value: StoredValue::Encoded(value),
            });
        }
        Ok(entries)
    }

    async fn clear(&self) -> EndbResult<()> {
        let (start, end) = self.namespace_range();
        let mut tx = self.tree.begin().map_err(|ref e| self.fail(e))?;

        let keys = {
            let mut iter = tx.range(&start, &end).map_err(|ref e| self.fail(e))?;
            iter.seek_first().map_err(|ref e| self.fail(e))?;
            let mut keys = Vec::new();
            while iter.valid() {
                keys.push(iter.key().to_vec());
                iter.next().map_err(|ref e| self.fail(e))?;
            }
            keys
        };

        if keys.is_empty() {
            return Ok(());
        }
        for key in &keys {
            tx.delete(key).map_err(|ref e| self.fail(e))?;
        }
        tx.commit().await.map_err(|ref e| self.fail(e))
    }

    async fn delete(&self, key: &str) -> EndbResult<bool> {
        let mut tx = self.tree.begin().map_err(|ref e| self.fail(e))?;
        let existed = tx
            .get(key.as_bytes())
            .map_err(|ref e| self.fail(e))?
            .is_some();
        if existed {
            tx.delete(key.as_bytes()).map_err(|ref e| self.fail(e))?;
            tx.commit().await.map_err(|ref e| self.fail(e))?;
        }
        Ok(existed)
    }

    async fn get(&self, key: &str) -> EndbResult<Option<StoredValue>> {
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| self.fail(e))?;
        let Some(bytes) = tx.get(key.as_bytes()).map_err(|ref e| self.fail(e))? else {
            return Ok(None);
        };
        String::from_utf8(bytes)
            .map(|text| Some(StoredValue::Encoded(text)))
            .map_err(|e| EndbError::Serialization(e.to_string()))
    }

    async fn has(&self, key: &str) -> EndbResult<bool> {
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(|ref e| self.fail(e))?;
        Ok(tx
            .get(key.as_bytes())
            .map_err(|ref e| self.fail(e))?
            .is_some())
    }

    async fn set(&self, key: &str, value: String) -> EndbResult<()> {
        let mut tx = self.tree.begin().map_err(|ref e| self.fail(e))?;
        tx.set(key.as_bytes(), value.as_bytes())
            .map_err(|ref e| self.fail(e))?;
        tx.commit().await.map_err(|ref e| self.fail(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_adapter() -> (SurrealKvAdapter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let adapter = SurrealKvAdapter::open(dir.path()).unwrap();
        (adapter, dir)
    }

    #[tokio::test]
    async fn test_surreal_get_set_delete() {
        let (adapter, _dir) = make_adapter();
        adapter.set("endb:k", "1".into()).await.unwrap();
        assert_eq!(
            adapter.get("endb:k").await.unwrap(),
            Some(StoredValue::Encoded("1".into()))
        );
        assert!(adapter.has("endb:k").await.unwrap());
        assert!(adapter.delete("endb:k").await.unwrap());
        assert!(!adapter.delete("endb:k").await.unwrap());
        assert!(adapter.get("endb:k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_surreal_all_and_clear_are_namespace_scoped() {
        let (mut adapter, _dir) = make_adapter();
        adapter.set_namespace("ns1");
        adapter.set("ns1:a", "1".into()).await.unwrap();
        adapter.set("ns1:b", "2".into()).await.unwrap();
        adapter.set("ns2:c", "3".into()).await.unwrap();

        let mut keys: Vec<String> = adapter
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["ns1:a", "ns1:b"]);

        adapter.clear().await.unwrap();
        assert!(adapter.all().await.unwrap().is_empty());
        assert!(adapter.has("ns2:c").await.unwrap());
    }

    #[tokio::test]
    async fn test_surreal_undecodable_value_is_an_error() {
        let (adapter, _dir) = make_adapter();
        adapter.set("endb:ok", "1".into()).await.unwrap();
        let mut tx = adapter.tree.begin().unwrap();
        tx.set(b"endb:raw", &[0xff, 0xfe]).unwrap();
        tx.commit().await.unwrap();

        assert!(matches!(
            adapter.all().await,
            Err(EndbError::Serialization(_))
        ));
        assert!(matches!(
            adapter.get("endb:raw").await,
            Err(EndbError::Serialization(_))
        ));
    }

    #[test]
    fn test_from_uri_requires_path() {
        assert!(SurrealKvAdapter::from_uri("surrealkv://").is_err());
        assert!(SurrealKvAdapter::from_uri("sqlite://x").is_err());
    }
}

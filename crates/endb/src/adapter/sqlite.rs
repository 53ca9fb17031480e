//! `SQLite` adapter.
//!
//! Entries live in a two-column table (default name `endb`):
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS endb (key TEXT PRIMARY KEY, value TEXT NOT NULL)
//! ```
//!
//! Every call runs on the blocking thread pool against a single connection.
//! Failures are returned to the caller and also pushed to the store's error
//! channel.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};

use super::{Adapter, AdapterEntry, StoredValue};
use crate::error::{BackendError, EndbError, EndbResult};
use crate::events::ErrorSink;
use crate::namespace::{DEFAULT_NAMESPACE, SEPARATOR};

const NAME: &str = "sqlite";

/// Default table name.
pub const DEFAULT_TABLE: &str = "endb";

/// Persistent adapter backed by a `SQLite` database file.
pub struct SqliteAdapter {
    conn: Arc<Mutex<Connection>>,
    table: String,
    namespace: String,
    sink: Option<ErrorSink>,
}

impl std::fmt::Debug for SqliteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAdapter")
            .field("table", &self.table)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_table(table: &str) -> EndbResult<()> {
    let valid = table
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(EndbError::Configuration(format!(
            "invalid sqlite table name {table:?}"
        )))
    }
}

/// Extract the database path from `sqlite://path` (or `sqlite:path`).
fn path_from_uri(uri: &str) -> EndbResult<&str> {
    let rest = uri.strip_prefix("sqlite:").ok_or_else(|| {
        EndbError::Configuration(format!("not a sqlite connection string: {uri:?}"))
    })?;
    let path = rest.strip_prefix("//").unwrap_or(rest);
    if path.is_empty() {
        return Err(EndbError::Configuration(format!(
            "sqlite connection string has no path: {uri:?}"
        )));
    }
    Ok(path)
}

impl SqliteAdapter {
    /// Open (or create) a database file using the default table.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Configuration`] if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> EndbResult<Self> {
        Self::open_with_table(path, DEFAULT_TABLE)
    }

    /// Open (or create) a database file storing entries in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Configuration`] if the table name is invalid or
    /// the database cannot be opened.
    pub fn open_with_table(path: impl AsRef<Path>, table: &str) -> EndbResult<Self> {
        validate_table(table)?;
        let conn = Connection::open(path.as_ref())
            .map_err(|e| EndbError::Configuration(format!("sqlite open failed: {e}")))?;
        Self::init(conn, table)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Configuration`] if the database cannot be created.
    pub fn open_in_memory() -> EndbResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EndbError::Configuration(format!("sqlite open failed: {e}")))?;
        Self::init(conn, DEFAULT_TABLE)
    }

    /// Open the database named by a `sqlite://path` connection string.
    ///
    /// `sqlite://:memory:` opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Configuration`] if the connection string has no
    /// path, the table name is invalid, or the database cannot be opened.
    pub fn from_uri(uri: &str, table: Option<&str>) -> EndbResult<Self> {
        let path = path_from_uri(uri)?;
        let table = table.unwrap_or(DEFAULT_TABLE);
        if path == ":memory:" {
            validate_table(table)?;
            let conn = Connection::open_in_memory()
                .map_err(|e| EndbError::Configuration(format!("sqlite open failed: {e}")))?;
            return Self::init(conn, table);
        }
        Self::open_with_table(path, table)
    }

    fn init(conn: Connection, table: &str) -> EndbResult<Self> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (key TEXT PRIMARY KEY, value TEXT NOT NULL)"
            ),
            [],
        )
        .map_err(|e| EndbError::Configuration(format!("sqlite table setup failed: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_owned(),
            namespace: DEFAULT_NAMESPACE.to_owned(),
            sink: None,
        })
    }

    /// The table entries are stored in.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    fn namespace_prefix(&self) -> (String, i64) {
        let prefix = format!("{}{SEPARATOR}", self.namespace);
        let len = i64::try_from(prefix.chars().count()).unwrap_or(i64::MAX);
        (prefix, len)
    }

    /// Run a statement on the blocking pool, reporting failures.
    async fn run<T, F>(&self, op: F) -> EndbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let table = self.table.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| e.to_string())?;
            op(&conn, &table).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|result| result);

        outcome.map_err(|message| {
            let error = BackendError::new(NAME, message);
            if let Some(sink) = &self.sink {
                sink.emit(error.clone());
            }
            EndbError::Backend(error)
        })
    }
}

#[async_trait]
impl Adapter for SqliteAdapter {
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
        let (prefix, len) = self.namespace_prefix();
        self.run(move |conn, table| {
            let mut stmt = conn.prepare(&format!(
                "SELECT key, value FROM {table} WHERE substr(key, 1, ?2) = ?1 ORDER BY key"
            ))?;
            let rows = stmt.query_map(params![prefix, len], |row| {
                Ok(AdapterEntry {
                    key: row.get(0)?,
                    value: StoredValue::Encoded(row.get(1)?),
                })
            })?;
            rows.collect()
        })
        .await
    }

    async fn clear(&self) -> EndbResult<()> {
        let (prefix, len) = self.namespace_prefix();
        self.run(move |conn, table| {
            conn.execute(
                &format!("DELETE FROM {table} WHERE substr(key, 1, ?2) = ?1"),
                params![prefix, len],
            )
            .map(|_| ())
        })
        .await
    }

    async fn delete(&self, key: &str) -> EndbResult<bool> {
        let key = key.to_owned();
        self.run(move |conn, table| {
            conn.execute(&format!("DELETE FROM {table} WHERE key = ?1"), params![key])
                .map(|changed| changed > 0)
        })
        .await
    }

    async fn get(&self, key: &str) -> EndbResult<Option<StoredValue>> {
        let key = key.to_owned();
        self.run(move |conn, table| {
            conn.query_row(
                &format!("SELECT value FROM {table} WHERE key = ?1"),
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map(|value| value.map(StoredValue::Encoded))
        })
        .await
    }

    async fn has(&self, key: &str) -> EndbResult<bool> {
        let key = key.to_owned();
        self.run(move |conn, table| {
            conn.query_row(
                &format!("SELECT 1 FROM {table} WHERE key = ?1"),
                params![key],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
        })
        .await
    }

    async fn set(&self, key: &str, value: String) -> EndbResult<()> {
        let key = key.to_owned();
        self.run(move |conn, table| {
            conn.execute(
                &format!("INSERT OR REPLACE INTO {table} (key, value) VALUES (?1, ?2)"),
                params![key, value],
            )
            .map(|_| ())
        })
        .await
    }
}

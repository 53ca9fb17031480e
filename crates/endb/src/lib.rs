//! Endb: one key-value interface over interchangeable storage backends.
//!
//! [`Endb`] exposes `get` / `set` / `delete` / `has` / `all` over any backend
//! implementing the [`Adapter`] trait. Every key is prefixed with a namespace,
//! so several logical stores can share one physical backend, and the `*_at`
//! methods read and write fields nested inside stored values.
//!
//! # Choosing a backend
//!
//! | Input | Backend |
//! |-------|---------|
//! | `.store(adapter)` | that adapter, as-is |
//! | `.adapter("sqlite")` | looked up in the [`AdapterRegistry`] |
//! | `.uri("sqlite://data.db")` | adapter named by the URI scheme |
//! | nothing | fresh [`MemoryAdapter`] |
//!
//! # Example
//!
//! ```rust,no_run
//! use endb::Endb;
//! use serde_json::json;
//!
//! # async fn run() -> endb::EndbResult<()> {
//! let store = Endb::builder().namespace("users").build()?;
//!
//! store.set("alice", &json!({"role": "admin"})).await?;
//! store.set_at("alice", &true, "flags.beta").await?;
//!
//! assert_eq!(store.get_at("alice", "flags.beta").await?, Some(json!(true)));
//! assert_eq!(store.keys().await?, vec!["alice".to_string()]);
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - **`sqlite`**: [`SqliteAdapter`] via `rusqlite`
//! - **`kv`**: [`SurrealKvAdapter`] via `surrealkv`
//! - **`full`**: both

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod adapter;
pub mod codec;
pub mod error;
pub mod events;
pub mod namespace;
pub mod options;
pub mod path;
pub mod resolver;
pub mod store;

pub use adapter::{Adapter, AdapterEntry, MemoryAdapter, StoredValue};
pub use codec::{Buffer, Codec, JsonCodec};
pub use error::{BackendError, EndbError, EndbResult};
pub use events::{ErrorSink, EventReceiver, StoreEvent};
pub use options::{StoreBuilder, StoreConfig, StoreOptions};
pub use resolver::{AdapterFactory, AdapterKind, AdapterRegistry};
pub use store::{Element, Endb};

#[cfg(feature = "sqlite")]
pub use adapter::SqliteAdapter;

#[cfg(feature = "kv")]
pub use adapter::SurrealKvAdapter;

/// Re-exported so callers can build values without a direct dependency.
pub use serde_json::{Value, json};

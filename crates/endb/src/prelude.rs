//! Prelude module - commonly used types for convenient import.
//!
//! Use `use endb::prelude::*;` to import all essential types.

// Errors
pub use crate::{BackendError, EndbError, EndbResult};

// Store
pub use crate::{Element, Endb, StoreBuilder, StoreConfig, StoreOptions};

// Backends
pub use crate::{Adapter, AdapterKind, AdapterRegistry, MemoryAdapter, StoredValue};

// Values
pub use crate::{Buffer, Codec, JsonCodec, Value, json};

// Events
pub use crate::{EventReceiver, StoreEvent};

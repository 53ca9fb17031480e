//! Key namespacing.
//!
//! Every logical key is stored as `"{namespace}:{key}"`. Stripping removes the
//! first occurrence of `"{namespace}:"` wherever it appears in the key, not
//! only at the start. Keys read back from a backend always carry the prefix at
//! the start, so this only matters when a backend hands back keys written
//! outside the store.

/// Separator between the namespace and the logical key.
pub const SEPARATOR: char = ':';

/// Default namespace for new stores.
pub const DEFAULT_NAMESPACE: &str = "endb";

/// Prefix a logical key with `namespace`.
#[must_use]
pub fn add_prefix(namespace: &str, key: &str) -> String {
    format!("{namespace}{SEPARATOR}{key}")
}

/// Strip the first `"{namespace}:"` occurrence from a stored key.
#[must_use]
pub fn remove_prefix(namespace: &str, key: &str) -> String {
    key.replacen(&format!("{namespace}{SEPARATOR}"), "", 1)
}

/// Whether a stored key belongs to `namespace`.
#[must_use]
pub fn in_namespace(namespace: &str, key: &str) -> bool {
    key.strip_prefix(namespace)
        .is_some_and(|rest| rest.starts_with(SEPARATOR))
}

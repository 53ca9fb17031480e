//! Layered CLI configuration.
//!
//! Sources, lowest precedence first:
//! 1. Embedded `defaults.toml`
//! 2. The file given by `--config`, else `./endb.toml` when present
//! 3. `ENDB_URI`, `ENDB_ADAPTER`, `ENDB_NAMESPACE`, `ENDB_TABLE`
//! 4. Command-line flags

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use endb::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogConfig;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Config file looked up in the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "endb.toml";

/// Environment variables mapped onto `[store]` fields.
const ENV_FIELDS: &[(&str, &str)] = &[
    ("ENDB_URI", "uri"),
    ("ENDB_ADAPTER", "adapter"),
    ("ENDB_NAMESPACE", "namespace"),
    ("ENDB_TABLE", "table"),
];

/// Fully merged CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CliConfig {
    /// Store selection.
    #[serde(default)]
    pub(crate) store: StoreConfig,
    /// Logging.
    #[serde(default)]
    pub(crate) log: LogConfig,
}

/// Store settings given on the command line.
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    pub(crate) uri: Option<String>,
    pub(crate) adapter: Option<String>,
    pub(crate) namespace: Option<String>,
    pub(crate) table: Option<String>,
}

/// Collect the `ENDB_*` variables from the process environment.
pub(crate) fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("ENDB_"))
        .collect()
}

/// Load and merge every configuration layer.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or parsed, or the merged
/// tree does not describe a valid configuration.
pub(crate) fn load(
    explicit: Option<&Path>,
    env_vars: &HashMap<String, String>,
    overrides: Overrides,
) -> Result<CliConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).context("failed to parse embedded defaults")?;

    let overlay = match explicit {
        Some(path) => Some((read_file(path)?, path.to_path_buf())),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            try_read_file(&path)?.map(|overlay| (overlay, path))
        },
    };
    if let Some((overlay, path)) = overlay {
        deep_merge(&mut merged, overlay);
        debug!(path = %path.display(), "loaded config file");
    }

    apply_env(&mut merged, env_vars);

    let mut config: CliConfig = merged
        .try_into()
        .context("invalid configuration")?;
    apply_overrides(&mut config.store, overrides);
    Ok(config)
}

fn read_file(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&content, path)
}

/// Like [`read_file`], but a missing file is `None`.
fn try_read_file(path: &Path) -> Result<Option<toml::Value>> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse(&content, path).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            Ok(None)
        },
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn parse(content: &str, path: &Path) -> Result<toml::Value> {
    toml::from_str(content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Merge `overlay` into `base`. Tables merge key by key; anything else
/// replaces.
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    },
                }
            }
        },
        (base, overlay) => *base = overlay,
    }
}

fn apply_env(merged: &mut toml::Value, env_vars: &HashMap<String, String>) {
    let Some(root) = merged.as_table_mut() else {
        return;
    };
    let store = root
        .entry("store")
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    let Some(store) = store.as_table_mut() else {
        return;
    };
    for (var, field) in ENV_FIELDS {
        if let Some(value) = env_vars.get(*var).filter(|v| !v.is_empty()) {
            debug!(var, field, "applying environment override");
            store.insert((*field).to_owned(), toml::Value::String(value.clone()));
        }
    }
}

fn apply_overrides(store: &mut StoreConfig, overrides: Overrides) {
    if let Some(uri) = overrides.uri {
        store.uri = Some(uri);
    }
    if let Some(adapter) = overrides.adapter {
        store.adapter = Some(adapter);
    }
    if let Some(namespace) = overrides.namespace {
        store.namespace = namespace;
    }
    if let Some(table) = overrides.table {
        store.table = Some(table);
    }
}

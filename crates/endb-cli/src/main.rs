//! endb CLI - inspect and edit key-value stores from the shell.
//!
//! The store is chosen the same way the library chooses it: `--adapter`
//! names a backend, otherwise the scheme of `--uri` does, otherwise an
//! in-memory map is used (useful only within one invocation).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use endb::{Endb, StoreOptions};
use tracing::debug;

mod commands;
mod config;
mod formatter;
mod logging;

use formatter::OutputFormat;

/// endb - one key-value interface over many backends
#[derive(Parser)]
#[command(name = "endb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Connection string, e.g. `sqlite://./data.db`
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Adapter name (sqlite, surrealkv, redis, ...)
    #[arg(long, global = true)]
    adapter: Option<String>,

    /// Namespace prefixed to every key
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Table or collection name
    #[arg(long, global = true)]
    table: Option<String>,

    /// Path to a TOML configuration file (default: ./endb.toml if present)
    #[arg(short, long, global = true, env = "ENDB_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the value stored under a key
    Get {
        /// Key to read
        key: String,
        /// Read a nested field instead, e.g. `profile.tags[0]`
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Store a value (JSON, or a plain string if it is not valid JSON)
    Set {
        /// Key to write
        key: String,
        /// Value to store
        value: String,
        /// Write a nested field, keeping its siblings
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Delete a key, or a nested field with --path
    Delete {
        /// Key to delete
        key: String,
        /// Remove only this nested field
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Check whether a key (or nested field) exists
    Has {
        /// Key to check
        key: String,
        /// Check a nested field
        #[arg(short, long)]
        path: Option<String>,
    },

    /// List keys in the namespace
    Keys,

    /// List values in the namespace
    Values,

    /// List key-value pairs in the namespace
    Entries,

    /// List every element in the namespace
    All,

    /// Remove every key in the namespace
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = config::Overrides {
        uri: cli.uri,
        adapter: cli.adapter,
        namespace: cli.namespace,
        table: cli.table,
    };
    let cfg = config::load(
        cli.config.as_deref(),
        &config::collect_env_vars(),
        overrides,
    )?;

    // Set up logging from config, with --verbose override.
    let mut log_config = cfg.log.clone();
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = logging::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e:#}");
    }
    debug!(store = ?cfg.store, "configuration loaded");

    let store = Endb::with_options(StoreOptions::from(cfg.store))
        .context("failed to open store")?;

    let output = commands::execute(&store, cli.command).await?;
    if let Some(text) = cli.format.render(&output) {
        println!("{text}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "endb",
            "get",
            "user",
            "--path",
            "name",
            "--uri",
            "sqlite://x.db",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.uri.as_deref(), Some("sqlite://x.db"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Get { ref key, path: Some(ref path) } if key == "user" && path == "name"
        ));
    }

    #[test]
    fn test_set_requires_value() {
        assert!(Cli::try_parse_from(["endb", "set", "k"]).is_err());
    }
}

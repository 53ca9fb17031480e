//! Logging configuration and setup.
//!
//! Logs always go to stderr so command output on stdout stays pipeable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogFormat {
    /// Multi-line human-readable format.
    Pretty,
    /// Compact single-line format.
    #[default]
    Compact,
    /// JSON format for structured logging.
    Json,
}

/// Logging configuration, read from the `[log]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LogConfig {
    /// Log level filter (e.g., "warn", "debug", "trace").
    #[serde(default = "default_level")]
    pub(crate) level: String,
    /// Log format.
    #[serde(default)]
    pub(crate) format: LogFormat,
    /// Directive overrides (e.g., `endb=trace`).
    #[serde(default)]
    pub(crate) directives: Vec<String>,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Build the env filter. `RUST_LOG`, when set, replaces the configured level.
    fn build_filter(&self) -> Result<EnvFilter> {
        let mut filter = match std::env::var("RUST_LOG") {
            Ok(env) if !env.is_empty() => {
                EnvFilter::try_new(&env).with_context(|| format!("invalid RUST_LOG {env:?}"))?
            },
            _ => EnvFilter::try_new(&self.level)
                .with_context(|| format!("invalid log level {:?}", self.level))?,
        };

        for directive in &self.directives {
            filter = filter.add_directive(
                directive
                    .parse()
                    .with_context(|| format!("invalid log directive {directive:?}"))?,
            );
        }

        Ok(filter)
    }
}

/// Set up logging with the given configuration.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub(crate) fn setup_logging(config: &LogConfig) -> Result<()> {
    let filter = config.build_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.context("failed to initialize logging")
}

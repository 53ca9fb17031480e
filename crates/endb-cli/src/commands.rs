//! Command execution against an open store.

use endb::{Endb, EndbResult};
use serde_json::Value;
use tracing::debug;

use crate::Commands;
use crate::formatter::Output;

/// Parse a command-line value: JSON when it parses, otherwise a plain string.
pub(crate) fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

/// Run one command.
///
/// # Errors
///
/// Returns whatever the store operation returns.
pub(crate) async fn execute(store: &Endb, command: Commands) -> EndbResult<Output> {
    debug!(?command, "executing");
    let output = match command {
        Commands::Get { key, path } => match path {
            Some(path) => Output::Value(store.get_at(&key, &path).await?),
            None => Output::Value(store.get(&key).await?),
        },
        Commands::Set { key, value, path } => {
            let value = parse_value(&value);
            match path {
                Some(path) => store.set_at(&key, &value, &path).await?,
                None => store.set(&key, &value).await?,
            };
            Output::Done
        },
        Commands::Delete { key, path } => match path {
            Some(path) => Output::Flag(store.delete_at(&key, &path).await?),
            None => Output::Flag(store.delete(&key).await?),
        },
        Commands::Has { key, path } => match path {
            Some(path) => Output::Flag(store.has_at(&key, &path).await?),
            None => Output::Flag(store.has(&key).await?),
        },
        Commands::Keys => Output::Keys(store.keys().await?),
        Commands::Values => Output::Values(store.values().await?),
        Commands::Entries => Output::Entries(store.entries().await?),
        Commands::All => Output::Elements(store.all().await?),
        Commands::Clear => {
            store.clear().await?;
            Output::Done
        },
    };
    Ok(output)
}

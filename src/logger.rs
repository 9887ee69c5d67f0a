//! Logging initialisation via tracing-subscriber.
//!
//! The hosting bot calls [`init`] once at startup; this core only emits
//! `tracing` events and never installs a subscriber on its own.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; `default_filter` is the fallback when the
/// environment provides nothing parseable. Fails if a subscriber is already
/// installed.
pub fn init(default_filter: &str) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| {
            EngineError::Logger(format!("invalid log filter '{default_filter}': {e}"))
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| EngineError::Logger(format!("failed to set subscriber: {e}")))?;

    Ok(())
}

/// Parse a log level string into a [`LevelFilter`], returning an error on
/// unrecognised values. Useful for validating config before initialising.
pub fn parse_level(level: &str) -> Result<LevelFilter, EngineError> {
    if level.is_empty() {
        return Err(EngineError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| EngineError::Logger(format!("unrecognised log level: '{level}'")))
}

//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config and environment
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the configured level

use tracing_subscriber::{
    filter::ParseError, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
    EnvFilter,
};

use crate::config::{LogFormat, ObservabilityConfig};

/// Errors raised while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log level '{level}': {source}")]
    Level {
        level: String,
        #[source]
        source: ParseError,
    },

    #[error("logging already initialized: {0}")]
    Init(#[from] TryInitError),
}

/// Build the filter: `RUST_LOG` if set, else the configured level for this
/// crate and the HTTP access log.
pub fn env_filter(config: &ObservabilityConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = format!(
        "petstore_proxy={level},tower_http={level}",
        level = config.log_level
    );
    EnvFilter::try_new(directives).map_err(|source| LoggingError::Level {
        level: config.log_level.clone(),
        source,
    })
}

/// Install the global tracing subscriber.
pub fn init(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = env_filter(config)?;
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .try_init()?;

    Ok(())
}

//! # Structured Logging
//!
//! The probe's only output channel. Every request status line, pre-flight
//! warning and phase summary goes through `tracing` and is rendered to
//! stdout by the subscriber installed here, either as plain text (default)
//! or as JSON lines.

use std::fmt;
use tracing::warn;
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};
use uuid::Uuid;

use crate::core::error::{ProbeError, ProbeResult};
use crate::observability::config::{LogConfig, LogFormat};

/// Identifier attached to every log line of one experiment run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// Generate a new run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Build the filter: `RUST_LOG` when set, the configured level otherwise.
pub fn build_env_filter(config: &LogConfig) -> ProbeResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            ProbeError::logging(format!("Invalid log level '{}': {}", config.level, e))
        }),
    }
}

/// Install the global subscriber.
///
/// A second call is harmless: the existing subscriber stays in place.
pub fn init_logging(config: &LogConfig) -> ProbeResult<()> {
    let env_filter = build_env_filter(config)?;

    let result = match config.format {
        LogFormat::Json => Registry::default()
            .with(env_filter)
            .with(
                tracing_fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Text => Registry::default()
            .with(env_filter)
            .with(
                tracing_fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .compact(),
            )
            .try_init(),
    };

    if result.is_err() {
        warn!("Tracing subscriber already initialized, skipping initialization");
    }

    Ok(())
}

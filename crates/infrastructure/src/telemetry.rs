//! Logging setup
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and either
//! a human-readable or a JSON formatter. Logs go to stderr so they never mix
//! with conversation output on stdout.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::TelemetryAppConfig;

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// Offending directive
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already set
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Pick the filter directive
///
/// `RUST_LOG` wins, then the command-line verbosity, then configuration.
pub fn filter_directive(
    config: &TelemetryAppConfig,
    verbosity: u8,
    rust_log: Option<String>,
) -> String {
    if let Some(directive) = rust_log.filter(|d| !d.trim().is_empty()) {
        return directive;
    }
    match verbosity {
        0 => config.log_filter.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber
pub fn init_logging(config: &TelemetryAppConfig, verbosity: u8) -> Result<(), TelemetryError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(config, verbosity, rust_log);
    let filter = EnvFilter::try_new(&directive).map_err(|e| TelemetryError::InvalidFilter {
        filter: directive.clone(),
        reason: e.to_string(),
    })?;

    let json = config.json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text = (!config.json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_takes_precedence() {
        let config = TelemetryAppConfig::default();
        assert_eq!(
            filter_directive(&config, 2, Some("ai_core=trace".into())),
            "ai_core=trace"
        );
    }

    #[test]
    fn verbosity_overrides_config() {
        let config = TelemetryAppConfig::default();
        assert_eq!(filter_directive(&config, 1, None), "info");
        assert_eq!(filter_directive(&config, 2, Some("  ".into())), "debug");
        assert_eq!(filter_directive(&config, 5, None), "trace");
    }

    #[test]
    fn config_filter_is_the_default() {
        let config = TelemetryAppConfig {
            log_filter: "application=debug".into(),
            json: false,
        };
        assert_eq!(filter_directive(&config, 0, None), "application=debug");
    }
}

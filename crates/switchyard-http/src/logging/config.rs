//! # Structured Logging Integration
//!
//! Subscriber setup for hosts embedding switchyard. Dispatch itself only
//! emits `tracing` events; nothing is printed unless a subscriber is
//! installed, either by the host or through [`init_logging`].

use crate::config::RoutingConfig;
use std::io;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

const PRODUCTION_FILTER: &str =
    "switchyard=info,switchyard_http=info,switchyard_security=warn,switchyard_validation=warn";
const DEVELOPMENT_FILTER: &str =
    "switchyard=debug,switchyard_http=debug,switchyard_security=debug,switchyard_validation=debug";

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Multi-line, human oriented
    Pretty,
    /// Single-line text
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub filter: String,
    pub format: LogFormat,
    /// Include file and line number information
    pub include_location: bool,
    pub include_timestamp: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: false,
            include_timestamp: true,
        }
    }
}

impl LoggingConfig {
    /// JSON events, dispatch at info and security/validation at warn
    pub fn production() -> Self {
        Self {
            filter: PRODUCTION_FILTER.to_string(),
            format: LogFormat::Json,
            include_location: false,
            include_timestamp: true,
        }
    }

    /// Pretty events with source locations, everything at debug
    pub fn development() -> Self {
        Self {
            filter: DEVELOPMENT_FILTER.to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            include_timestamp: true,
        }
    }

    /// Errors only, no timestamps
    pub fn test() -> Self {
        Self {
            filter: "switchyard_http=error".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            include_timestamp: false,
        }
    }

    /// `development()` when the routing layer runs in debug mode, else `production()`
    pub fn for_routing(config: &RoutingConfig) -> Self {
        if config.debug {
            Self::development()
        } else {
            Self::production()
        }
    }

    pub fn with_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.filter = filter.into();
        self
    }
}

fn fmt_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let base = fmt::layer()
        .with_writer(io::stdout)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    match (config.format, config.include_timestamp) {
        (LogFormat::Json, true) => base.json().boxed(),
        (LogFormat::Json, false) => base.json().without_time().boxed(),
        (LogFormat::Pretty, true) => base.pretty().boxed(),
        (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
        (LogFormat::Compact, true) => base.compact().boxed(),
        (LogFormat::Compact, false) => base.compact().without_time().boxed(),
    }
}

/// Install a global subscriber; fails if one is already installed
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.filter))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(&config))
        .try_init()?;

    tracing::info!(
        target: "switchyard::logging",
        filter = %config.filter,
        format = ?config.format,
        "structured logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_presets() {
        let prod = LoggingConfig::production();
        assert_eq!(prod.format, LogFormat::Json);
        assert!(prod.filter.contains("switchyard_http=info"));

        let dev = LoggingConfig::development();
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.include_location);

        let test = LoggingConfig::test();
        assert_eq!(test.format, LogFormat::Compact);
        assert!(!test.include_timestamp);
    }

    #[test]
    fn test_follows_routing_debug_flag() {
        let debug = RoutingConfig::default().debug(true);
        assert_eq!(LoggingConfig::for_routing(&debug).filter, DEVELOPMENT_FILTER);
        assert_eq!(
            LoggingConfig::for_routing(&RoutingConfig::default()).format,
            LogFormat::Json
        );
        assert_eq!(LoggingConfig::default().with_filter("debug").filter, "debug");
    }

    #[test]
    fn test_filter_directives_parse() {
        for config in [
            LoggingConfig::production(),
            LoggingConfig::development(),
            LoggingConfig::test(),
        ] {
            assert!(EnvFilter::try_new(&config.filter).is_ok());
        }
    }
}

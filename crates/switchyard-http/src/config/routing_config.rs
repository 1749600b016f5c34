//! Routing layer configuration
//!
//! Loaded from `SWITCHYARD_*` environment variables or built in code; the
//! dispatcher reads it once at build time.

use super::defaults::RoutingDefaults;
use super::validation::ConfigError;
use crate::middleware::MiddlewareSpec;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Dispatcher and built-in middleware configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Show handler error details in response envelopes
    pub debug: bool,
    /// Treat unknown validation rules as errors
    pub strict_rules: bool,
    /// Middleware specs run ahead of every route's own chain
    pub global_middleware: Vec<String>,
    /// Capability admin routes require when they declare none
    pub admin_capability: String,
    /// Header carrying a one-time token
    pub nonce_header: String,
    /// Body or query field carrying a one-time token
    pub nonce_field: String,
    /// How long an issued token stays valid
    pub nonce_lifetime_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            debug: RoutingDefaults::DEBUG,
            strict_rules: RoutingDefaults::STRICT_RULES,
            global_middleware: Vec::new(),
            admin_capability: RoutingDefaults::ADMIN_CAPABILITY.to_string(),
            nonce_header: RoutingDefaults::NONCE_HEADER.to_string(),
            nonce_field: RoutingDefaults::NONCE_FIELD.to_string(),
            nonce_lifetime_secs: RoutingDefaults::NONCE_LIFETIME_SECS,
        }
    }
}

impl RoutingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let debug = parse_bool("SWITCHYARD_DEBUG", "debug", RoutingDefaults::DEBUG)?;
        let strict_rules = parse_bool(
            "SWITCHYARD_STRICT_RULES",
            "strict_rules",
            RoutingDefaults::STRICT_RULES,
        )?;

        let global_middleware = get_env_or_default("SWITCHYARD_GLOBAL_MIDDLEWARE", "")?
            .split('|')
            .map(str::trim)
            .filter(|spec| !spec.is_empty())
            .map(String::from)
            .collect();

        let admin_capability =
            get_env_or_default("SWITCHYARD_ADMIN_CAPABILITY", RoutingDefaults::ADMIN_CAPABILITY)?;

        let nonce_lifetime_secs = get_env_or_default(
            "SWITCHYARD_NONCE_LIFETIME",
            &RoutingDefaults::NONCE_LIFETIME_SECS.to_string(),
        )?
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue {
            field: "nonce_lifetime_secs".to_string(),
            value: env::var("SWITCHYARD_NONCE_LIFETIME").unwrap_or_default(),
            expected: "valid number of seconds".to_string(),
        })?;

        let config = RoutingConfig {
            debug,
            strict_rules,
            global_middleware,
            admin_capability,
            nonce_lifetime_secs,
            ..RoutingConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn strict_rules(mut self, strict: bool) -> Self {
        self.strict_rules = strict;
        self
    }

    pub fn global_middleware(mut self, spec: impl Into<String>) -> Self {
        self.global_middleware.push(spec.into());
        self
    }

    pub fn admin_capability(mut self, capability: impl Into<String>) -> Self {
        self.admin_capability = capability.into();
        self
    }

    /// Parsed global middleware specs
    pub fn global_specs(&self) -> Result<Vec<MiddlewareSpec>, ConfigError> {
        MiddlewareSpec::parse_all(&self.global_middleware).map_err(|e| ConfigError::InvalidValue {
            field: "global_middleware".to_string(),
            value: self.global_middleware.join("|"),
            expected: e.to_string(),
        })
    }

    /// Get nonce lifetime as Duration
    pub fn nonce_lifetime(&self) -> Duration {
        Duration::from_secs(self.nonce_lifetime_secs)
    }
}

fn parse_bool(key: &str, field: &str, default: bool) -> Result<bool, ConfigError> {
    get_env_or_default(key, &default.to_string())?
        .parse::<bool>()
        .map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            value: env::var(key).unwrap_or_default(),
            expected: "true or false".to_string(),
        })
}

// Helper function for environment variable handling
fn get_env_or_default(key: &str, default: &str) -> Result<String, ConfigError> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
}

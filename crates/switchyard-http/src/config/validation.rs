//! Configuration validation logic

use super::RoutingConfig;
use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

impl RoutingConfig {
    /// Validate the routing configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_capability.trim().is_empty() {
            return Err(ConfigError::validation_failed("Admin capability must not be empty"));
        }

        if self.nonce_header.trim().is_empty() || http::HeaderName::from_bytes(self.nonce_header.as_bytes()).is_err() {
            return Err(ConfigError::invalid_value(
                "nonce_header",
                &self.nonce_header,
                "a valid HTTP header name",
            ));
        }

        if self.nonce_field.trim().is_empty() {
            return Err(ConfigError::validation_failed("Nonce field must not be empty"));
        }

        if self.nonce_lifetime_secs == 0 {
            return Err(ConfigError::validation_failed("Nonce lifetime must be greater than 0"));
        }

        self.global_specs()?;

        Ok(())
    }
}

//! # switchyard-security
//!
//! Security middleware for the switchyard routing layer: per-route rate
//! limiting, CORS headers and single-use tokens. Everything plugs into a
//! [`switchyard_http::MiddlewareRegistry`] through [`register_security`].

pub mod config;
pub mod integration;
pub mod middleware;

// Re-export main types
pub use config::{CorsConfig, NonceConfig, RateLimitConfig, SecurityConfig};
pub use integration::{register_security, SecurityServices};
pub use middleware::cors::CorsMiddleware;
pub use middleware::nonce::{InMemoryNonceStore, NonceMiddleware, NonceStore};
pub use middleware::rate_limit::{CounterStore, InMemoryCounterStore, RateLimitMiddleware};

/// Common result type for security operations
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Security-related errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SecurityError {
    #[error("Invalid CORS origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("Invalid header name '{name}'")]
    InvalidHeaderName { name: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl SecurityError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        SecurityError::ConfigError {
            message: message.into(),
        }
    }
}

//! Configuration-time errors
//!
//! Everything here surfaces from route registration or `Dispatcher::build`,
//! never from serving a request.

use crate::config::ConfigError;
use crate::routing::{RoutePatternError, RouteType};
use switchyard_validation::RuleParseError;
use thiserror::Error;

/// Result type for registration and build operations
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Middleware specification and resolution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MiddlewareError {
    #[error("Malformed middleware spec '{spec}': {reason}")]
    MalformedSpec { spec: String, reason: String },

    #[error("Unknown middleware: {name}")]
    UnknownMiddleware { name: String },

    #[error("Invalid parameters for middleware '{name}': {reason}")]
    InvalidParameters { name: String, reason: String },

    #[error("Unknown rule set '{name}'")]
    UnknownRuleSet { name: String },
}

impl MiddlewareError {
    pub fn malformed<S: Into<String>, R: Into<String>>(spec: S, reason: R) -> Self {
        MiddlewareError::MalformedSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_parameters<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        MiddlewareError::InvalidParameters {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Route registration and dispatcher build errors
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Invalid route pattern '{path}': {source}")]
    InvalidPattern {
        path: String,
        #[source]
        source: RoutePatternError,
    },

    #[error("Route '{path}' declares no HTTP methods")]
    NoMethods { path: String },

    #[error("Duplicate route name '{name}' for {route_type} routes")]
    DuplicateRouteName { route_type: RouteType, name: String },

    #[error(transparent)]
    Middleware(#[from] MiddlewareError),

    #[error("Cannot resolve handler '{handler}': {reason}")]
    UnresolvedHandler { handler: String, reason: String },

    #[error(transparent)]
    Rules(#[from] RuleParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RoutingError {
    pub fn unresolved_handler<H: Into<String>, R: Into<String>>(handler: H, reason: R) -> Self {
        RoutingError::UnresolvedHandler {
            handler: handler.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RoutingError::DuplicateRouteName {
            route_type: RouteType::Api,
            name: "users.show".into(),
        };
        assert_eq!(err.to_string(), "Duplicate route name 'users.show' for api routes");

        let err: RoutingError = MiddlewareError::UnknownMiddleware { name: "throttle".into() }.into();
        assert_eq!(err.to_string(), "Unknown middleware: throttle");
    }
}

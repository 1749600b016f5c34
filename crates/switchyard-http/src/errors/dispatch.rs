//! Request-time errors produced by the dispatcher

use crate::routing::{HttpMethod, RouteType};
use http::{HeaderMap, StatusCode};
use switchyard_validation::ValidationErrors;
use thiserror::Error;

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Everything that can stop a request between matching and the handler's return
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No {route_type} route matches {method} {path}")]
    RouteNotFound {
        route_type: RouteType,
        method: HttpMethod,
        path: String,
    },

    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: HttpMethod,
        path: String,
        allowed: Vec<HttpMethod>,
    },

    #[error("Request rejected by '{middleware}': {detail}")]
    MiddlewareRejected {
        middleware: String,
        detail: String,
        status: StatusCode,
        /// Headers written by middleware that ran before the rejection
        headers: HeaderMap,
    },

    #[error("{errors}")]
    ValidationFailed {
        errors: ValidationErrors,
        headers: HeaderMap,
    },

    #[error("Unknown middleware: {name}")]
    UnknownMiddleware { name: String },

    #[error("Cannot generate URL for route '{name}': {reason}")]
    UnresolvableUrl { name: String, reason: String },

    #[error("Handler failed: {source}")]
    Handler {
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    pub fn unresolvable_url<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        DispatchError::UnresolvableUrl {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::MiddlewareRejected { status, .. } => *status,
            DispatchError::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DispatchError::UnknownMiddleware { .. }
            | DispatchError::UnresolvableUrl { .. }
            | DispatchError::Handler { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::RouteNotFound { .. } => "route_not_found",
            DispatchError::MethodNotAllowed { .. } => "method_not_allowed",
            DispatchError::MiddlewareRejected { .. } => "middleware_rejected",
            DispatchError::ValidationFailed { .. } => "validation_failed",
            DispatchError::UnknownMiddleware { .. } => "unknown_middleware",
            DispatchError::UnresolvableUrl { .. } => "unresolvable_url",
            DispatchError::Handler { .. } => "handler_error",
        }
    }

    /// Response headers collected before the failure, if any
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            DispatchError::MiddlewareRejected { headers, .. }
            | DispatchError::ValidationFailed { headers, .. } => Some(headers),
            _ => None,
        }
    }
}

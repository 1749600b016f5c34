//! # Middleware
//!
//! Cross-cutting checks that run between route matching and the handler.
//! Routes name middleware by spec string (`"auth"`, `"rate_limit:10,60"`);
//! specs are parsed on registration and resolved to instances through the
//! [`MiddlewareRegistry`] when the dispatcher is built.

pub mod builtin;
pub mod pipeline;
pub mod registry;
pub mod spec;

pub use builtin::{
    register_builtins, AuthMiddleware, CapabilityMiddleware, CatalogEntry, JsonOnlyMiddleware, RuleSetCatalog,
    ValidateMiddleware,
};
pub use pipeline::MiddlewarePipeline;
pub use registry::{MiddlewareFactory, MiddlewareRegistry};
pub use spec::{dedup_by_name, effective_middleware, MiddlewareParam, MiddlewareSpec};

use crate::request::RouteContext;
use http::{HeaderMap, StatusCode};
use std::fmt;
use switchyard_validation::ValidationErrors;

/// Why a middleware stopped the request
#[derive(Debug, Clone)]
pub struct MiddlewareRejection {
    /// Name of the rejecting middleware; filled in by the pipeline when left empty
    pub middleware: String,
    pub status: StatusCode,
    pub message: String,
    /// Field errors, for middleware that validates input
    pub errors: Option<ValidationErrors>,
}

impl MiddlewareRejection {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            middleware: String::new(),
            status,
            message: message.into(),
            errors: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, message)
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        Self {
            middleware: String::new(),
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "The given data was invalid".to_string(),
            errors: Some(errors),
        }
    }

    /// Attribute the rejection to a middleware
    pub fn by(mut self, middleware: impl Into<String>) -> Self {
        self.middleware = middleware.into();
        self
    }
}

impl fmt::Display for MiddlewareRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.middleware, self.status.as_u16(), self.message)
    }
}

/// A check run before the handler.
///
/// Middleware may write response headers through `headers`; they are kept
/// whether the request goes on to succeed or not.
pub trait Middleware: Send + Sync + fmt::Debug {
    /// Name used in logs and rejection reports
    fn name(&self) -> &str;

    fn handle(&self, ctx: &RouteContext<'_>, headers: &mut HeaderMap) -> Result<(), MiddlewareRejection>;
}

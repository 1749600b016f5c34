//! Middleware pipeline for running resolved middleware in sequence

use super::{Middleware, MiddlewareRegistry, MiddlewareRejection, MiddlewareSpec};
use crate::errors::MiddlewareError;
use crate::request::RouteContext;
use http::HeaderMap;
use std::fmt;
use std::sync::Arc;

/// Ordered, fail-fast middleware chain
#[derive(Default, Clone)]
pub struct MiddlewarePipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewarePipeline {
    /// Create a new empty middleware pipeline
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
        }
    }

    /// Resolve every spec through the registry, in order
    pub fn resolve(registry: &MiddlewareRegistry, specs: &[MiddlewareSpec]) -> Result<Self, MiddlewareError> {
        let middleware = specs
            .iter()
            .map(|spec| registry.resolve(spec))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { middleware })
    }

    /// Add middleware to the pipeline
    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Run each middleware in order, stopping at the first rejection.
    ///
    /// Effects of middleware that already ran are kept.
    pub fn run(&self, ctx: &RouteContext<'_>, headers: &mut HeaderMap) -> Result<(), MiddlewareRejection> {
        for middleware in &self.middleware {
            if let Err(rejection) = middleware.handle(ctx, headers) {
                let rejection = if rejection.middleware.is_empty() {
                    rejection.by(middleware.name())
                } else {
                    rejection
                };
                tracing::warn!(
                    middleware = %rejection.middleware,
                    status = rejection.status.as_u16(),
                    route = %ctx.route().identity(),
                    "request rejected: {}",
                    rejection.message
                );
                return Err(rejection);
            }
        }
        Ok(())
    }

    /// Get number of middleware in pipeline
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Check if pipeline is empty
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Get middleware names for debugging
    pub fn names(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }
}

impl fmt::Debug for MiddlewarePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewarePipeline")
            .field("middleware", &self.names())
            .finish()
    }
}

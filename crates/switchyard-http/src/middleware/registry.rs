//! Name → middleware factory lookup

use super::{Middleware, MiddlewareSpec};
use crate::errors::MiddlewareError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a configured middleware from a parsed spec, validating its parameters
pub type MiddlewareFactory =
    Arc<dyn Fn(&MiddlewareSpec) -> Result<Arc<dyn Middleware>, MiddlewareError> + Send + Sync>;

/// Registry of middleware factories
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    factories: HashMap<String, MiddlewareFactory>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&MiddlewareSpec) -> Result<Arc<dyn Middleware>, MiddlewareError> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(middleware = %name, "registered middleware factory");
        self.factories.insert(name, Arc::new(factory));
        self
    }

    /// Register a middleware that takes no parameters
    pub fn register_instance<M>(&mut self, name: impl Into<String>, middleware: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        let name = name.into();
        let instance: Arc<dyn Middleware> = Arc::new(middleware);
        let label = name.clone();
        self.register(name, move |spec: &MiddlewareSpec| {
            if !spec.params.is_empty() {
                return Err(MiddlewareError::invalid_parameters(&label, "takes no parameters"));
            }
            Ok(Arc::clone(&instance))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Instantiate the middleware a spec refers to
    pub fn resolve(&self, spec: &MiddlewareSpec) -> Result<Arc<dyn Middleware>, MiddlewareError> {
        let factory = self
            .factories
            .get(&spec.name)
            .ok_or_else(|| MiddlewareError::UnknownMiddleware {
                name: spec.name.clone(),
            })?;
        let middleware = factory(spec)?;
        tracing::debug!(spec = %spec, "resolved middleware");
        Ok(middleware)
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("factories", &self.names())
            .finish()
    }
}

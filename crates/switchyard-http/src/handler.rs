//! Route handlers
//!
//! A route names its handler either as a closure or as a
//! `"Controller@action"` string. Strings resolve against a
//! [`HandlerRegistry`] once, when the dispatcher is built; an unknown
//! controller or action is a build error rather than a request-time 404.

use crate::errors::{RoutingError, RoutingResult};
use crate::request::RouteContext;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A resolved, callable handler
pub type HandlerFn = Arc<dyn Fn(&RouteContext<'_>) -> anyhow::Result<Value> + Send + Sync>;

/// How a route refers to its handler
#[derive(Clone)]
pub enum HandlerRef {
    /// A closure registered directly with the route
    Callable(HandlerFn),
    /// A controller action resolved at build time
    Action { controller: String, action: String },
}

impl HandlerRef {
    /// Parse `"Controller@action"`; a bare controller name targets `__invoke`
    pub fn action(reference: &str) -> Self {
        match reference.split_once('@') {
            Some((controller, action)) => HandlerRef::Action {
                controller: controller.trim().to_string(),
                action: action.trim().to_string(),
            },
            None => HandlerRef::Action {
                controller: reference.trim().to_string(),
                action: "__invoke".to_string(),
            },
        }
    }

    /// Human-readable form used in logs and route listings
    pub fn describe(&self) -> String {
        match self {
            HandlerRef::Callable(_) => "closure".to_string(),
            HandlerRef::Action { controller, action } => format!("{}@{}", controller, action),
        }
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandlerRef({})", self.describe())
    }
}

impl From<&str> for HandlerRef {
    fn from(reference: &str) -> Self {
        HandlerRef::action(reference)
    }
}

impl From<String> for HandlerRef {
    fn from(reference: String) -> Self {
        HandlerRef::action(&reference)
    }
}

impl From<HandlerFn> for HandlerRef {
    fn from(handler: HandlerFn) -> Self {
        HandlerRef::Callable(handler)
    }
}

/// Wrap a closure as a route handler
pub fn handler<F>(f: F) -> HandlerRef
where
    F: Fn(&RouteContext<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    HandlerRef::Callable(Arc::new(f))
}

/// A named set of actions addressable as `"Name@action"`
pub trait Controller: Send + Sync {
    /// The actions this controller answers to
    fn actions(&self) -> &[&'static str];

    /// Run one action
    fn handle(&self, action: &str, ctx: &RouteContext<'_>) -> anyhow::Result<Value>;
}

/// Controller lookup used while building the dispatcher
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    controllers: HashMap<String, Arc<dyn Controller>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller under `name`, replacing any previous one
    pub fn register<C: Controller + 'static>(&mut self, name: impl Into<String>, controller: C) -> &mut Self {
        let name = name.into();
        tracing::debug!(controller = %name, "registered controller");
        self.controllers.insert(name, Arc::new(controller));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.controllers.contains_key(name)
    }

    /// Turn a handler reference into something callable
    pub fn resolve(&self, reference: &HandlerRef) -> RoutingResult<HandlerFn> {
        match reference {
            HandlerRef::Callable(handler) => Ok(Arc::clone(handler)),
            HandlerRef::Action { controller, action } => {
                let target = self.controllers.get(controller).ok_or_else(|| {
                    RoutingError::unresolved_handler(reference.describe(), "unknown controller")
                })?;
                if !target.actions().contains(&action.as_str()) {
                    return Err(RoutingError::unresolved_handler(
                        reference.describe(),
                        format!("controller '{}' has no action '{}'", controller, action),
                    ));
                }

                let target = Arc::clone(target);
                let action = action.clone();
                Ok(Arc::new(move |ctx: &RouteContext<'_>| target.handle(&action, ctx)))
            }
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.controllers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry").field("controllers", &names).finish()
    }
}

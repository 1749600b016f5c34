//! # switchyard-http
//!
//! Route registry, middleware pipeline and dispatcher for switchyard.
//!
//! Routes are registered into a [`RouteRegistry`] (directly, in groups, or
//! as resources), then frozen into a [`Dispatcher`] together with a
//! [`MiddlewareRegistry`] and a [`HandlerRegistry`]. Building the dispatcher
//! resolves every middleware spec and handler reference, so configuration
//! mistakes surface before the first request.
//!
//! The crate is transport-agnostic: a binding implements [`RequestContext`]
//! for its request type and serializes the [`ResponseEnvelope`].

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod handler;
pub mod logging;
pub mod middleware;
pub mod request;
pub mod response;
pub mod routing;
pub mod testing;

pub use config::{ConfigError, RoutingConfig, RoutingDefaults};
pub use dispatcher::{AdminMenuEntry, Dispatcher};
pub use errors::{DispatchError, DispatchResult, MiddlewareError, RoutingError, RoutingResult};
pub use handler::{handler, Controller, HandlerFn, HandlerRef, HandlerRegistry};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use middleware::{
    register_builtins, CatalogEntry, Middleware, MiddlewareFactory, MiddlewareParam, MiddlewarePipeline,
    MiddlewareRegistry, MiddlewareRejection, MiddlewareSpec, RuleSetCatalog,
};
pub use request::{RequestContext, RouteContext};
pub use response::{Dispatched, ErrorBody, ResponseEnvelope};
pub use routing::{
    GroupAttributes, HttpMethod, MatchOutcome, MenuMeta, ResourceAction, ResourceOptions, RouteDefinition,
    RouteInfo, RouteMatch, RouteRegistry, RouteType,
};

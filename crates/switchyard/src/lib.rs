//! # switchyard
//!
//! A request-routing layer that puts programmatic API calls, page requests,
//! admin screens and in-page async actions behind one registration syntax,
//! one middleware pipeline and one validation engine.
//!
//! This is the umbrella package: it re-exports the sub-crates and provides
//! the [`Switchyard`] builder, which wires every built-in middleware and
//! freezes the result into a [`Dispatcher`].
//!
//! ```ignore
//! use switchyard::prelude::*;
//!
//! let dispatcher = Switchyard::new(RoutingConfig::default())
//!     .controller("Posts", PostsController)
//!     .routes(|r| {
//!         r.resource("posts", "Posts", ResourceOptions::default())?;
//!         Ok(())
//!     })?
//!     .build()?;
//!
//! let result = dispatcher.dispatch(RouteType::Api, HttpMethod::GET, "/posts/7", &request);
//! let envelope = dispatcher.respond(&result);
//! ```

// Re-export all sub-packages as modules
pub use switchyard_http as http;
pub use switchyard_security as security;
pub use switchyard_validation as validation;

mod builder;
pub mod prelude;

pub use builder::{Switchyard, SwitchyardError};

// Re-export common types at root level for convenience
pub use switchyard_http::{
    handler, Controller, DispatchError, DispatchResult, Dispatched, Dispatcher, GroupAttributes, HttpMethod,
    Middleware, MiddlewareRejection, RequestContext, ResponseEnvelope, RouteContext, RouteDefinition,
    RouteRegistry, RouteType, RoutingConfig, RoutingError,
};
pub use switchyard_security::{CorsConfig, SecurityConfig, SecurityServices};
pub use switchyard_validation::{RuleSet, ValidationErrors, Validator};

/// Current version of switchyard
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the crate version
pub fn version() -> &'static str {
    VERSION
}

//! # Prelude
//!
//! The prelude module provides convenient imports for common switchyard functionality.
//!
//! ```rust
//! use switchyard::prelude::*;
//! ```

// Registration and dispatch
pub use crate::{Switchyard, SwitchyardError};
pub use switchyard_http::{
    handler, Dispatched, Dispatcher, GroupAttributes, HttpMethod, MenuMeta, ResourceAction, ResourceOptions,
    RouteDefinition, RouteRegistry, RouteType,
};

// Errors and responses
pub use switchyard_http::{DispatchError, DispatchResult, ResponseEnvelope, RoutingError};

// Extension points
pub use switchyard_http::{Controller, Middleware, MiddlewareRejection, MiddlewareSpec, RequestContext, RouteContext};

// Configuration
pub use switchyard_http::RoutingConfig;
pub use switchyard_security::{CorsConfig, SecurityConfig};

// Validation
pub use switchyard_validation::{Attributes, Messages, RuleSet, StoreQuery, ValidationErrors, Validator};

// JSON helper
pub use serde_json::{json, Value};

//! Dispatch results and their serialized envelope

pub mod envelope;

pub use envelope::{ErrorBody, ResponseEnvelope};

use crate::routing::{MenuMeta, RouteType};
use http::HeaderMap;
use serde_json::Value;

/// A request that made it through the pipeline and the handler
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub route_name: Option<String>,
    pub route_type: RouteType,
    /// Handler output
    pub payload: Value,
    /// Headers written by middleware
    pub headers: HeaderMap,
    /// Template the host should render, for web and admin routes
    pub template: Option<String>,
    pub title: Option<String>,
    pub menu: Option<MenuMeta>,
}

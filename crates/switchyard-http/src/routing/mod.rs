//! Route registration and matching
//!
//! This module provides:
//! - Path patterns compiled to anchored regexes
//! - Route definitions with fluent options
//! - Route groups with prefix, middleware and name-prefix inheritance
//! - Resource expansion into CRUD routes
//! - Per-type, first-registered-wins matching and named-route URL generation

pub mod group;
pub mod pattern;
pub mod registry;
pub mod resource;
pub mod route;

pub use group::GroupAttributes;
pub use pattern::{normalize_path, ParamConstraint, RoutePattern, RoutePatternError, UrlBuildError};
pub use registry::{MatchOutcome, RouteInfo, RouteMatch, RouteRegistry};
pub use resource::{ResourceAction, ResourceOptions};
pub use route::{MenuMeta, Route, RouteDefinition};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    /// Every method, in the order `any()` registers them
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::GET,
        HttpMethod::POST,
        HttpMethod::PUT,
        HttpMethod::DELETE,
        HttpMethod::PATCH,
        HttpMethod::HEAD,
        HttpMethod::OPTIONS,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .iter()
            .copied()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported HTTP method '{}'", s))
    }
}

impl TryFrom<&http::Method> for HttpMethod {
    type Error = String;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::GET => http::Method::GET,
            HttpMethod::POST => http::Method::POST,
            HttpMethod::PUT => http::Method::PUT,
            HttpMethod::DELETE => http::Method::DELETE,
            HttpMethod::PATCH => http::Method::PATCH,
            HttpMethod::HEAD => http::Method::HEAD,
            HttpMethod::OPTIONS => http::Method::OPTIONS,
        }
    }
}

/// The four entry-point families; each has its own route table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    /// Programmatic API calls
    Api,
    /// Browser page requests
    Web,
    /// Administrative dashboard pages
    Admin,
    /// Asynchronous in-page actions
    Ajax,
}

impl RouteType {
    pub const ALL: [RouteType; 4] = [RouteType::Api, RouteType::Web, RouteType::Admin, RouteType::Ajax];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Api => "api",
            RouteType::Web => "web",
            RouteType::Admin => "admin",
            RouteType::Ajax => "ajax",
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RouteType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown route type '{}'", s))
    }
}

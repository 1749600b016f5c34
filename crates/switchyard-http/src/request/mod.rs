//! Request abstraction consumed by the dispatcher
//!
//! The transport binding implements [`RequestContext`]; the dispatcher wraps
//! it in a [`RouteContext`] once a route has matched, adding the route and
//! its path parameters.

use crate::routing::Route;
use serde_json::{Map, Value};
use std::collections::HashMap;
use switchyard_validation::path;

/// An already-parsed request. The core only reads it.
pub trait RequestContext: Send + Sync {
    /// Query parameters as a JSON object
    fn query(&self) -> &Value;

    /// Decoded request body; `Value::Null` when there is none
    fn body(&self) -> &Value;

    /// Header lookup, case-insensitive
    fn header(&self, name: &str) -> Option<&str>;

    fn is_authenticated(&self) -> bool;

    fn has_capability(&self, capability: &str) -> bool;

    /// Stable identifier for the caller, used to key rate limits and nonces
    fn caller_key(&self) -> String;

    fn path_param(&self, _name: &str) -> Option<&str> {
        None
    }

    fn query_param(&self, name: &str) -> Option<&Value> {
        path::resolve(self.query(), name)
    }

    fn body_param(&self, name: &str) -> Option<&Value> {
        path::resolve(self.body(), name)
    }

    fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Query merged under body
    fn all(&self) -> Value {
        let mut merged = Map::new();
        overlay(&mut merged, self.query());
        overlay(&mut merged, self.body());
        Value::Object(merged)
    }
}

/// A request bound to the route it matched
#[derive(Clone, Copy)]
pub struct RouteContext<'r> {
    request: &'r dyn RequestContext,
    route: &'r Route,
    params: &'r HashMap<String, String>,
}

impl<'r> RouteContext<'r> {
    pub fn new(request: &'r dyn RequestContext, route: &'r Route, params: &'r HashMap<String, String>) -> Self {
        Self { request, route, params }
    }

    pub fn route(&self) -> &'r Route {
        self.route
    }

    pub fn params(&self) -> &'r HashMap<String, String> {
        self.params
    }

    /// The wrapped transport request
    pub fn request(&self) -> &'r dyn RequestContext {
        self.request
    }
}

impl RequestContext for RouteContext<'_> {
    fn query(&self) -> &Value {
        self.request.query()
    }

    fn body(&self) -> &Value {
        self.request.body()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    fn is_authenticated(&self) -> bool {
        self.request.is_authenticated()
    }

    fn has_capability(&self, capability: &str) -> bool {
        self.request.has_capability(capability)
    }

    fn caller_key(&self) -> String {
        self.request.caller_key()
    }

    fn path_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Query under body, path parameters on top
    fn all(&self) -> Value {
        let mut merged = match self.request.all() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (name, value) in self.params {
            merged.insert(name.clone(), Value::String(value.clone()));
        }
        Value::Object(merged)
    }
}

fn overlay(target: &mut Map<String, Value>, source: &Value) {
    if let Value::Object(map) = source {
        for (key, value) in map {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{RouteDefinition, RouteRegistry, RouteType, HttpMethod};
    use crate::testing::TestRequest;
    use serde_json::json;

    #[test]
    fn test_all_merges_in_order() {
        let request = TestRequest::post()
            .with_query(json!({"page": "1", "id": "from-query", "sort": "asc"}))
            .json(json!({"id": "from-body", "title": "Hello"}));

        assert_eq!(request.all()["id"], "from-body");
        assert_eq!(request.all()["sort"], "asc");

        let mut registry = RouteRegistry::new();
        registry
            .register(RouteDefinition::post(RouteType::Api, "/posts/:id", "Posts@update"))
            .unwrap();
        let matched = registry
            .match_route(RouteType::Api, HttpMethod::POST, "/posts/9")
            .matched()
            .unwrap();
        let ctx = RouteContext::new(&request, matched.route, &matched.params);

        let all = ctx.all();
        assert_eq!(all["id"], "9");
        assert_eq!(all["title"], "Hello");
        assert_eq!(all["page"], "1");
        assert_eq!(ctx.path_param("id"), Some("9"));
        assert_eq!(request.path_param("id"), None);
    }

    #[test]
    fn test_dot_path_params() {
        let request = TestRequest::post().json(json!({"author": {"email": "ada@example.com"}}));
        assert_eq!(
            request.body_param("author.email"),
            Some(&Value::from("ada@example.com"))
        );
        assert_eq!(request.query_param("author"), None);
    }
}

//! Test fixtures and utilities

use crate::errors::MiddlewareError;
use crate::handler::{handler, Controller, HandlerRef};
use crate::middleware::{Middleware, MiddlewareRejection};
use crate::request::{RequestContext, RouteContext};
use crate::routing::{HttpMethod, Route, RouteDefinition, RouteRegistry, RouteType};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// In-memory request implementing [`RequestContext`]
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: HttpMethod,
    query: Value,
    body: Value,
    headers: HashMap<String, String>,
    authenticated: bool,
    capabilities: HashSet<String>,
    caller: String,
}

impl Default for TestRequest {
    fn default() -> Self {
        Self::new(HttpMethod::GET)
    }
}

impl TestRequest {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            query: Value::Object(Map::new()),
            body: Value::Null,
            headers: HashMap::new(),
            authenticated: false,
            capabilities: HashSet::new(),
            caller: "ip:127.0.0.1".to_string(),
        }
    }

    pub fn get() -> Self {
        Self::new(HttpMethod::GET)
    }

    pub fn post() -> Self {
        Self::new(HttpMethod::POST)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    pub fn query_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Value::Object(map) = &mut self.query {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    /// JSON body with a matching content type
    pub fn json(self, body: Value) -> Self {
        self.with_body(body).header("content-type", "application/json")
    }

    /// Raw decoded body; no content type is set
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    /// Authenticated caller keyed by user id
    pub fn user(mut self, id: u64) -> Self {
        self.authenticated = true;
        self.caller = format!("user:{}", id);
        self
    }

    /// Grant a capability; implies an authenticated caller
    pub fn capability(mut self, capability: &str) -> Self {
        self.authenticated = true;
        self.capabilities.insert(capability.to_string());
        self
    }

    pub fn caller(mut self, key: &str) -> Self {
        self.caller = key.to_string();
        self
    }
}

impl RequestContext for TestRequest {
    fn query(&self) -> &Value {
        &self.query
    }

    fn body(&self) -> &Value {
        &self.body
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    fn caller_key(&self) -> String {
        self.caller.clone()
    }
}

/// Resource controller answering every conventional action
#[derive(Debug, Default, Clone)]
pub struct PostsController;

impl Controller for PostsController {
    fn actions(&self) -> &[&'static str] {
        &["index", "create", "store", "show", "edit", "update", "destroy"]
    }

    fn handle(&self, action: &str, ctx: &RouteContext<'_>) -> anyhow::Result<Value> {
        match action {
            "index" => Ok(json!({"posts": []})),
            "store" => Ok(json!({"created": ctx.body()})),
            _ => Ok(json!({"action": action, "params": ctx.params()})),
        }
    }
}

/// Echoes path parameters and merged input
pub fn echo_handler() -> HandlerRef {
    handler(|ctx: &RouteContext<'_>| Ok(json!({"params": ctx.params(), "input": ctx.all()})))
}

/// Always fails with an error
pub fn failing_handler() -> HandlerRef {
    handler(|_ctx: &RouteContext<'_>| Err(anyhow::anyhow!("handler exploded")))
}

/// Always panics
pub fn panicking_handler() -> HandlerRef {
    handler(|_ctx: &RouteContext<'_>| -> anyhow::Result<Value> { panic!("handler panicked") })
}

/// A registered api GET route for `path`, for exercising middleware in isolation
pub fn route_fixture(path: &str) -> Route {
    let mut registry = RouteRegistry::new();
    registry
        .register(RouteDefinition::get(RouteType::Api, path, echo_handler()))
        .unwrap_or_else(|e| panic!("invalid fixture route {}: {}", path, e));
    let route = registry
        .iter()
        .next()
        .cloned()
        .unwrap_or_else(|| panic!("fixture route {} was not registered", path));
    route
}

/// Shared record of middleware invocations, in call order
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, name: &str) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(name.to_string());
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

/// What a [`RecordingMiddleware`] does when invoked
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Pass,
    Reject(StatusCode),
    /// Write a header, then pass
    Header(&'static str, &'static str),
}

/// Middleware that records its invocation and then follows a fixed [`Step`]
#[derive(Debug, Clone)]
pub struct RecordingMiddleware {
    name: String,
    step: Step,
    log: CallLog,
}

impl RecordingMiddleware {
    pub fn new(name: impl Into<String>, step: Step) -> Self {
        Self {
            name: name.into(),
            step,
            log: CallLog::default(),
        }
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    /// A factory for [`crate::middleware::MiddlewareRegistry::register`]
    pub fn factory(
        self,
    ) -> impl Fn(&crate::middleware::MiddlewareSpec) -> Result<Arc<dyn Middleware>, MiddlewareError> + Send + Sync
    {
        let instance: Arc<dyn Middleware> = Arc::new(self);
        move |_spec: &crate::middleware::MiddlewareSpec| Ok(Arc::clone(&instance))
    }
}

impl Middleware for RecordingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, _ctx: &RouteContext<'_>, headers: &mut HeaderMap) -> Result<(), MiddlewareRejection> {
        self.log.record(&self.name);
        match self.step {
            Step::Pass => Ok(()),
            Step::Reject(status) => Err(MiddlewareRejection::new(status, format!("{} rejected", self.name))),
            Step::Header(name, value) => {
                headers.insert(name, HeaderValue::from_static(value));
                Ok(())
            }
        }
    }
}

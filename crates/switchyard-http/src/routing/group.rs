//! Route groups for shared prefixes, middleware and name prefixes

use crate::errors::RoutingResult;
use crate::middleware::{dedup_by_name, MiddlewareSpec};
use serde_json::Value;
use std::collections::BTreeMap;

/// Attributes applied to every route registered inside a group
#[derive(Debug, Clone, Default)]
pub struct GroupAttributes {
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub middleware: Vec<String>,
    /// Route name prefix, e.g. `"admin."`
    pub as_name: Option<String>,
    pub attributes: BTreeMap<String, Value>,
}

impl GroupAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn middleware(mut self, spec: impl Into<String>) -> Self {
        self.middleware.push(spec.into());
        self
    }

    pub fn as_name(mut self, as_name: impl Into<String>) -> Self {
        self.as_name = Some(as_name.into());
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// The accumulated context of all enclosing groups
#[derive(Debug, Clone, Default)]
pub(crate) struct GroupScope {
    pub prefix: String,
    pub namespace: String,
    pub middleware: Vec<MiddlewareSpec>,
    pub as_name: String,
    pub attributes: BTreeMap<String, Value>,
}

impl GroupScope {
    /// Nest `attrs` inside this scope
    pub fn nest(&self, attrs: &GroupAttributes) -> RoutingResult<GroupScope> {
        let own = MiddlewareSpec::parse_all(&attrs.middleware)?;
        let mut attributes = self.attributes.clone();
        attributes.extend(attrs.attributes.clone());

        Ok(GroupScope {
            prefix: join_segments(&self.prefix, attrs.prefix.as_deref()),
            namespace: join_segments(&self.namespace, attrs.namespace.as_deref()),
            middleware: dedup_by_name([self.middleware.as_slice(), own.as_slice()]),
            as_name: format!("{}{}", self.as_name, attrs.as_name.as_deref().unwrap_or("")),
            attributes,
        })
    }

    /// Full path of a route declared as `path` inside this scope
    pub fn path(&self, path: &str) -> String {
        join_segments(&self.prefix, Some(path))
    }

    pub fn name(&self, name: Option<&str>) -> Option<String> {
        name.map(|name| format!("{}{}", self.as_name, name))
    }

    pub fn namespace(&self, namespace: Option<&str>) -> Option<String> {
        let joined = join_segments(&self.namespace, namespace);
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }

    /// Group attributes under the route's own; the route wins on conflicts
    pub fn attributes(&self, own: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
        let mut merged = self.attributes.clone();
        merged.extend(own.clone());
        merged
    }
}

/// `/`-join two segments, trimming surrounding slashes on each side
fn join_segments(outer: &str, inner: Option<&str>) -> String {
    let outer = outer.trim_matches('/');
    let inner = inner.unwrap_or("").trim_matches('/');
    match (outer.is_empty(), inner.is_empty()) {
        (true, _) => inner.to_string(),
        (false, true) => outer.to_string(),
        (false, false) => format!("{}/{}", outer, inner),
    }
}

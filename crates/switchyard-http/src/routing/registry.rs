//! Per-type route tables with first-registered-wins matching

use super::group::GroupScope;
use super::resource::{self, ResourceAction, ResourceOptions};
use super::route::{Route, RouteDefinition};
use super::{normalize_path, GroupAttributes, HttpMethod, RoutePattern, RouteType};
use crate::errors::{DispatchError, RoutingError, RoutingResult};
use crate::middleware::{dedup_by_name, MiddlewareSpec};
use serde::Serialize;
use std::collections::HashMap;

/// Summary of a registered route for listings and diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteInfo {
    pub name: Option<String>,
    pub route_type: RouteType,
    pub methods: Vec<HttpMethod>,
    pub path: String,
    /// Group namespaces joined with the route's own, outermost first
    pub namespace: Option<String>,
    /// Group and route middleware, de-duplicated; globals are not included
    pub middleware: Vec<String>,
}

impl From<&Route> for RouteInfo {
    fn from(route: &Route) -> Self {
        let middleware = dedup_by_name([route.group_middleware.as_slice(), route.middleware.as_slice()]);
        Self {
            name: route.name.clone(),
            route_type: route.route_type,
            methods: route.methods.clone(),
            path: route.path().to_string(),
            namespace: route.namespace.clone(),
            middleware: middleware.iter().map(ToString::to_string).collect(),
        }
    }
}

/// A matched route and the parameters extracted from the path
#[derive(Debug, Clone)]
pub struct RouteMatch<'r> {
    pub route: &'r Route,
    pub params: HashMap<String, String>,
}

/// Result of resolving `(type, method, path)`
#[derive(Debug, Clone)]
pub enum MatchOutcome<'r> {
    Matched(RouteMatch<'r>),
    NotFound,
    /// The path matched at least one route, but none accepts the method
    MethodNotAllowed { allowed: Vec<HttpMethod> },
}

impl<'r> MatchOutcome<'r> {
    pub fn matched(self) -> Option<RouteMatch<'r>> {
        match self {
            MatchOutcome::Matched(m) => Some(m),
            _ => None,
        }
    }
}

/// Route registry
///
/// Routes are kept in registration order; matching walks them in that order
/// and the first pattern that matches wins.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: Vec<Route>,
    named: HashMap<(RouteType, String), usize>,
    scope: GroupScope,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route under the currently active group context
    pub fn register(&mut self, definition: RouteDefinition) -> RoutingResult<&mut Self> {
        let full_path = self.scope.path(&definition.path);
        if definition.methods.is_empty() {
            return Err(RoutingError::NoMethods { path: full_path });
        }

        let pattern = RoutePattern::parse(&full_path).map_err(|source| RoutingError::InvalidPattern {
            path: full_path.clone(),
            source,
        })?;
        let middleware = MiddlewareSpec::parse_all(&definition.middleware)?;
        let name = self.scope.name(definition.name.as_deref());

        if let Some(name) = &name {
            let key = (definition.route_type, name.clone());
            if self.named.contains_key(&key) {
                return Err(RoutingError::DuplicateRouteName {
                    route_type: definition.route_type,
                    name: name.clone(),
                });
            }
            self.named.insert(key, self.routes.len());
        }

        let route = Route {
            route_type: definition.route_type,
            methods: definition.methods,
            pattern,
            handler: definition.handler,
            name,
            namespace: self.scope.namespace(definition.namespace.as_deref()),
            group_middleware: self.scope.middleware.clone(),
            middleware,
            capability: definition.capability,
            template: definition.template,
            title: definition.title,
            menu: definition.menu,
            public: definition.public,
            rules: definition.rules,
            attributes: self.scope.attributes(&definition.attributes),
            index: self.routes.len(),
        };

        tracing::debug!(
            route_type = %route.route_type,
            path = %route.path(),
            name = ?route.name,
            handler = %route.handler.describe(),
            "registered route"
        );
        self.routes.push(route);
        Ok(self)
    }

    /// Register routes inside a group; the group context is popped even if `routes` fails
    pub fn group<F>(&mut self, attributes: GroupAttributes, routes: F) -> RoutingResult<&mut Self>
    where
        F: FnOnce(&mut RouteRegistry) -> RoutingResult<()>,
    {
        let nested = self.scope.nest(&attributes)?;
        let outer = std::mem::replace(&mut self.scope, nested);
        let result = routes(self);
        self.scope = outer;
        result.map(|_| self)
    }

    /// Expand a resource into up to seven CRUD routes
    pub fn resource(&mut self, name: &str, controller: &str, options: ResourceOptions) -> RoutingResult<&mut Self> {
        for definition in resource::expand(name, controller, &options) {
            self.register(definition)?;
        }
        Ok(self)
    }

    /// Like `resource`, without the `create` and `edit` form routes
    pub fn api_resource(&mut self, name: &str, controller: &str, options: ResourceOptions) -> RoutingResult<&mut Self> {
        let options = options.except(&[ResourceAction::Create, ResourceAction::Edit]);
        self.resource(name, controller, options)
    }

    /// Resolve a request; any query string on `path` is ignored
    pub fn match_route(&self, route_type: RouteType, method: HttpMethod, path: &str) -> MatchOutcome<'_> {
        let path = normalize_path(path.split('?').next().unwrap_or(""));
        let mut allowed: Vec<HttpMethod> = Vec::new();

        for route in self.routes.iter().filter(|route| route.route_type == route_type) {
            let Some(params) = route.pattern.captures(&path) else {
                continue;
            };
            if route.allows(method) {
                tracing::debug!(
                    route_type = %route_type,
                    method = %method,
                    path = %path,
                    pattern = %route.path(),
                    "route matched"
                );
                return MatchOutcome::Matched(RouteMatch { route, params });
            }
            allowed.extend(route.methods.iter().copied());
        }

        if allowed.is_empty() {
            MatchOutcome::NotFound
        } else {
            allowed.sort();
            allowed.dedup();
            MatchOutcome::MethodNotAllowed { allowed }
        }
    }

    /// Build a URL for a named route, searching api, web, admin and ajax in that order
    pub fn url_for(&self, name: &str, params: &HashMap<String, String>) -> Result<String, DispatchError> {
        let route_type = RouteType::ALL
            .iter()
            .copied()
            .find(|route_type| self.named.contains_key(&(*route_type, name.to_string())))
            .ok_or_else(|| DispatchError::unresolvable_url(name, "no route with that name"))?;
        self.url_for_type(route_type, name, params)
    }

    /// Build a URL for a named route of one type
    pub fn url_for_type(
        &self,
        route_type: RouteType,
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<String, DispatchError> {
        let route = self
            .named
            .get(&(route_type, name.to_string()))
            .and_then(|index| self.routes.get(*index))
            .ok_or_else(|| DispatchError::unresolvable_url(name, "no route with that name"))?;

        route
            .pattern
            .build(params)
            .map_err(|e| DispatchError::unresolvable_url(name, e.to_string()))
    }

    /// Registered routes in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Listing of every registered route
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.routes.iter().map(RouteInfo::from).collect()
    }
}

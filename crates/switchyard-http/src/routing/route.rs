//! Route definitions and their compiled form

use super::{HttpMethod, RoutePattern, RouteType};
use crate::handler::HandlerRef;
use crate::middleware::MiddlewareSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use switchyard_validation::RuleSet;

/// Admin menu entry attached to a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuMeta {
    pub menu_title: String,
    pub icon: Option<String>,
    pub position: Option<i32>,
    /// Slug of the parent menu; `None` for a top-level entry
    pub parent: Option<String>,
}

impl MenuMeta {
    pub fn new(menu_title: impl Into<String>) -> Self {
        Self {
            menu_title: menu_title.into(),
            icon: None,
            position: None,
            parent: None,
        }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn position(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// One endpoint as declared, before group context and compilation apply
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    pub route_type: RouteType,
    pub methods: Vec<HttpMethod>,
    pub path: String,
    pub handler: HandlerRef,
    pub name: Option<String>,
    pub namespace: Option<String>,
    /// Raw middleware specs, parsed on registration
    pub middleware: Vec<String>,
    pub capability: Option<String>,
    pub template: Option<String>,
    pub title: Option<String>,
    pub menu: Option<MenuMeta>,
    pub public: bool,
    pub rules: Option<RuleSet>,
    pub attributes: BTreeMap<String, Value>,
}

impl RouteDefinition {
    pub fn new(
        route_type: RouteType,
        methods: impl IntoIterator<Item = HttpMethod>,
        path: impl Into<String>,
        handler: impl Into<HandlerRef>,
    ) -> Self {
        let mut unique: Vec<HttpMethod> = Vec::new();
        for method in methods {
            if !unique.contains(&method) {
                unique.push(method);
            }
        }
        Self {
            route_type,
            methods: unique,
            path: path.into(),
            handler: handler.into(),
            name: None,
            namespace: None,
            middleware: Vec::new(),
            capability: None,
            template: None,
            title: None,
            menu: None,
            public: false,
            rules: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn get(route_type: RouteType, path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
        Self::new(route_type, [HttpMethod::GET], path, handler)
    }

    pub fn post(route_type: RouteType, path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
        Self::new(route_type, [HttpMethod::POST], path, handler)
    }

    pub fn put(route_type: RouteType, path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
        Self::new(route_type, [HttpMethod::PUT], path, handler)
    }

    pub fn patch(route_type: RouteType, path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
        Self::new(route_type, [HttpMethod::PATCH], path, handler)
    }

    pub fn delete(route_type: RouteType, path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
        Self::new(route_type, [HttpMethod::DELETE], path, handler)
    }

    /// Register for every supported method
    pub fn any(route_type: RouteType, path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
        Self::new(route_type, HttpMethod::ALL, path, handler)
    }

    /// Register for an explicit method list
    pub fn match_methods(
        route_type: RouteType,
        methods: &[HttpMethod],
        path: impl Into<String>,
        handler: impl Into<HandlerRef>,
    ) -> Self {
        Self::new(route_type, methods.iter().copied(), path, handler)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Append one middleware spec, e.g. `"rate_limit:10,60"`
    pub fn middleware(mut self, spec: impl Into<String>) -> Self {
        self.middleware.push(spec.into());
        self
    }

    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn menu(mut self, menu: MenuMeta) -> Self {
        self.menu = Some(menu);
        self
    }

    /// Mark an ajax route as reachable without authentication
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Inline validation applied after the middleware chain passes
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A registered route with group context applied and its pattern compiled
#[derive(Debug, Clone)]
pub struct Route {
    pub route_type: RouteType,
    pub methods: Vec<HttpMethod>,
    pub pattern: RoutePattern,
    pub handler: HandlerRef,
    /// Full name including group `as` prefixes
    pub name: Option<String>,
    pub namespace: Option<String>,
    /// Middleware inherited from enclosing groups, outer to inner
    pub group_middleware: Vec<MiddlewareSpec>,
    /// Middleware declared on the route itself
    pub middleware: Vec<MiddlewareSpec>,
    pub capability: Option<String>,
    pub template: Option<String>,
    pub title: Option<String>,
    pub menu: Option<MenuMeta>,
    pub public: bool,
    pub rules: Option<RuleSet>,
    pub attributes: BTreeMap<String, Value>,
    /// Registration order across the whole registry
    pub index: usize,
}

impl Route {
    /// Normalized path pattern
    pub fn path(&self) -> &str {
        &self.pattern.path
    }

    /// `type:METHODS:path`, stable across rebuilds and unique per route
    pub fn identity(&self) -> String {
        let methods: Vec<&str> = self.methods.iter().map(HttpMethod::as_str).collect();
        format!("{}:{}:{}", self.route_type, methods.join("|"), self.pattern.path)
    }

    pub fn allows(&self, method: HttpMethod) -> bool {
        self.methods.contains(&method)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fluent_options() {
        let def = RouteDefinition::get(RouteType::Admin, "/settings", "Settings@index")
            .name("settings")
            .capability("manage_options")
            .template("admin/settings.html")
            .title("Settings")
            .menu(MenuMeta::new("Settings").icon("gear").position(80))
            .middleware("cors")
            .attribute("section", "general");

        assert_eq!(def.methods, vec![HttpMethod::GET]);
        assert_eq!(def.name.as_deref(), Some("settings"));
        assert_eq!(def.menu.as_ref().and_then(|m| m.position), Some(80));
        assert_eq!(def.middleware, vec!["cors".to_string()]);
        assert_eq!(def.attributes.get("section"), Some(&Value::from("general")));
        assert!(!def.public);
    }

    #[test]
    fn test_method_helpers() {
        assert_eq!(
            RouteDefinition::any(RouteType::Api, "/x", "X@y").methods.len(),
            HttpMethod::ALL.len()
        );
        let def = RouteDefinition::match_methods(
            RouteType::Api,
            &[HttpMethod::GET, HttpMethod::POST],
            "/x",
            "X@y",
        );
        assert_eq!(def.methods, vec![HttpMethod::GET, HttpMethod::POST]);
    }
}

//! Request dispatch
//!
//! [`Dispatcher::build`] consumes a [`RouteRegistry`], resolves every
//! handler reference and middleware chain once, and freezes the result.
//! Dispatching then only matches, runs the pre-resolved pipeline, validates
//! the route's rules and calls the handler. Nothing is resolved per request.

use crate::config::RoutingConfig;
use crate::errors::{DispatchError, DispatchResult, RoutingError, RoutingResult};
use crate::handler::{HandlerFn, HandlerRegistry};
use crate::middleware::{
    dedup_by_name, effective_middleware, MiddlewareParam, MiddlewarePipeline, MiddlewareRegistry,
    MiddlewareRejection, MiddlewareSpec,
};
use crate::request::{RequestContext, RouteContext};
use crate::response::{Dispatched, ResponseEnvelope};
use crate::routing::{
    HttpMethod, MatchOutcome, MenuMeta, Route, RouteInfo, RouteMatch, RouteRegistry, RouteType,
};
use http::HeaderMap;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use switchyard_validation::Validator;

/// Handler and middleware chain resolved for one route
struct PreparedRoute {
    handler: HandlerFn,
    chain: Vec<MiddlewareSpec>,
    pipeline: MiddlewarePipeline,
}

/// One admin menu entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminMenuEntry {
    pub route_name: Option<String>,
    pub path: String,
    pub title: Option<String>,
    pub menu: MenuMeta,
}

/// Frozen routing table with pre-resolved pipelines
pub struct Dispatcher {
    routes: RouteRegistry,
    prepared: Vec<PreparedRoute>,
    validator: Arc<Validator>,
    config: RoutingConfig,
}

impl Dispatcher {
    /// Resolve handlers, middleware and rules for every route.
    ///
    /// Fails on the first unknown middleware, invalid middleware parameter,
    /// unresolvable handler or (in strict mode) unknown validation rule.
    pub fn build(
        routes: RouteRegistry,
        middleware: &MiddlewareRegistry,
        handlers: &HandlerRegistry,
        validator: Arc<Validator>,
        config: RoutingConfig,
    ) -> RoutingResult<Self> {
        config.validate()?;
        let global = config.global_specs()?;
        // Global middleware must resolve even when no route uses it yet
        MiddlewarePipeline::resolve(middleware, &global)?;
        let strict = config.strict_rules || validator.config().strict;

        let mut prepared = Vec::with_capacity(routes.len());
        for route in routes.iter() {
            let handler = handlers.resolve(&route.handler)?;

            if strict {
                if let Some(rules) = &route.rules {
                    validator.check_rules(rules)?;
                }
            }

            let chain = Self::chain_for(route, &global, &config);
            let pipeline = MiddlewarePipeline::resolve(middleware, &chain).map_err(RoutingError::from)?;
            tracing::debug!(
                route = %route.identity(),
                middleware = ?pipeline.names(),
                "prepared route"
            );

            prepared.push(PreparedRoute {
                handler,
                chain,
                pipeline,
            });
        }

        let mut per_type: HashMap<RouteType, usize> = HashMap::new();
        for route in routes.iter() {
            *per_type.entry(route.route_type).or_default() += 1;
        }
        tracing::info!(
            routes = routes.len(),
            api = per_type.get(&RouteType::Api).copied().unwrap_or(0),
            web = per_type.get(&RouteType::Web).copied().unwrap_or(0),
            admin = per_type.get(&RouteType::Admin).copied().unwrap_or(0),
            ajax = per_type.get(&RouteType::Ajax).copied().unwrap_or(0),
            global_middleware = global.len(),
            strict_rules = strict,
            "dispatcher built"
        );

        Ok(Self {
            routes,
            prepared,
            validator,
            config,
        })
    }

    /// Explicit chain (global, group, route) followed by implicit requirements
    fn chain_for(route: &Route, global: &[MiddlewareSpec], config: &RoutingConfig) -> Vec<MiddlewareSpec> {
        let mut chain = effective_middleware(global, &route.group_middleware, &route.middleware);

        let mut implicit = Vec::new();
        if route.route_type == RouteType::Ajax && !route.public {
            implicit.push(MiddlewareSpec::named("auth"));
        }
        let capability = route.capability.clone().or_else(|| {
            (route.route_type == RouteType::Admin).then(|| config.admin_capability.clone())
        });
        if let Some(capability) = capability {
            implicit.push(MiddlewareSpec {
                name: "capability".to_string(),
                params: vec![MiddlewareParam::text(capability)],
            });
        }

        // Identical specs collapse; a differing capability still runs
        for spec in dedup_by_name([implicit.as_slice()]) {
            if !chain.contains(&spec) {
                chain.push(spec);
            }
        }
        chain
    }

    /// Match, run middleware, validate and invoke the handler
    pub fn dispatch(
        &self,
        route_type: RouteType,
        method: HttpMethod,
        path: &str,
        request: &dyn RequestContext,
    ) -> DispatchResult<Dispatched> {
        let RouteMatch { route, params } = match self.routes.match_route(route_type, method, path) {
            MatchOutcome::Matched(matched) => matched,
            MatchOutcome::NotFound => {
                tracing::debug!(route_type = %route_type, method = %method, path = %path, "no route matched");
                return Err(DispatchError::RouteNotFound {
                    route_type,
                    method,
                    path: path.to_string(),
                });
            }
            MatchOutcome::MethodNotAllowed { allowed } => {
                return Err(DispatchError::MethodNotAllowed {
                    method,
                    path: path.to_string(),
                    allowed,
                });
            }
        };

        let prepared = self
            .prepared
            .get(route.index)
            .ok_or_else(|| DispatchError::RouteNotFound {
                route_type,
                method,
                path: path.to_string(),
            })?;

        let ctx = RouteContext::new(request, route, &params);
        let mut headers = HeaderMap::new();

        if let Err(rejection) = prepared.pipeline.run(&ctx, &mut headers) {
            return Err(Self::rejected(rejection, headers));
        }

        if let Some(rules) = &route.rules {
            let input = ctx.all();
            if let Err(errors) = self.validator.validate(&input, rules) {
                tracing::debug!(route = %route.identity(), fields = errors.len(), "route rules failed");
                return Err(DispatchError::ValidationFailed { errors, headers });
            }
        }

        let handler = &prepared.handler;
        let payload = match panic::catch_unwind(AssertUnwindSafe(|| handler(&ctx))) {
            Ok(Ok(payload)) => payload,
            Ok(Err(source)) => {
                tracing::error!(route = %route.identity(), error = ?source, "handler failed");
                return Err(DispatchError::Handler { source });
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(route = %route.identity(), panic = %message, "handler panicked");
                return Err(DispatchError::Handler {
                    source: anyhow::anyhow!("handler panicked: {}", message),
                });
            }
        };

        Ok(Dispatched {
            route_name: route.name.clone(),
            route_type: route.route_type,
            payload,
            headers,
            template: route.template.clone(),
            title: route.title.clone(),
            menu: route.menu.clone(),
        })
    }

    fn rejected(rejection: MiddlewareRejection, headers: HeaderMap) -> DispatchError {
        match rejection.errors {
            Some(errors) => DispatchError::ValidationFailed { errors, headers },
            None => DispatchError::MiddlewareRejected {
                middleware: rejection.middleware,
                detail: rejection.message,
                status: rejection.status,
                headers,
            },
        }
    }

    /// Serialize a dispatch result; handler details only show in debug mode
    pub fn respond(&self, result: &DispatchResult<Dispatched>) -> ResponseEnvelope {
        ResponseEnvelope::from_result(result, self.config.debug)
    }

    pub fn match_route(&self, route_type: RouteType, method: HttpMethod, path: &str) -> MatchOutcome<'_> {
        self.routes.match_route(route_type, method, path)
    }

    pub fn url_for(&self, name: &str, params: &HashMap<String, String>) -> DispatchResult<String> {
        self.routes.url_for(name, params)
    }

    pub fn url_for_type(
        &self,
        route_type: RouteType,
        name: &str,
        params: &HashMap<String, String>,
    ) -> DispatchResult<String> {
        self.routes.url_for_type(route_type, name, params)
    }

    /// Routes of one type with their full middleware chains, in registration order
    pub fn routes(&self, route_type: RouteType) -> Vec<RouteInfo> {
        self.routes
            .iter()
            .zip(&self.prepared)
            .filter(|(route, _)| route.route_type == route_type)
            .map(|(route, prepared)| RouteInfo {
                middleware: prepared.chain.iter().map(ToString::to_string).collect(),
                ..RouteInfo::from(route)
            })
            .collect()
    }

    /// Admin menu entries sorted by position, then title; unpositioned entries last
    pub fn admin_menu(&self) -> Vec<AdminMenuEntry> {
        let mut entries: Vec<AdminMenuEntry> = self
            .routes
            .iter()
            .filter(|route| route.route_type == RouteType::Admin)
            .filter_map(|route| {
                route.menu.clone().map(|menu| AdminMenuEntry {
                    route_name: route.name.clone(),
                    path: route.path().to_string(),
                    title: route.title.clone(),
                    menu,
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            let position = |entry: &AdminMenuEntry| entry.menu.position.unwrap_or(i32::MAX);
            position(a)
                .cmp(&position(b))
                .then_with(|| a.menu.menu_title.cmp(&b.menu.menu_title))
        });
        entries
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.len())
            .field("config", &self.config)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{register_builtins, RuleSetCatalog};
    use crate::routing::{GroupAttributes, RouteDefinition};
    use crate::testing::{
        echo_handler, failing_handler, panicking_handler, CallLog, PostsController, RecordingMiddleware, Step,
        TestRequest,
    };
    use http::StatusCode;
    use serde_json::json;
    use switchyard_validation::RuleSet;
    use tracing_test::traced_test;

    fn middleware_registry() -> MiddlewareRegistry {
        let mut registry = MiddlewareRegistry::new();
        register_builtins(
            &mut registry,
            Arc::new(RuleSetCatalog::new()),
            Arc::new(Validator::new()),
        );
        registry
    }

    fn handlers() -> HandlerRegistry {
        let mut handlers = HandlerRegistry::new();
        handlers.register("Posts", PostsController);
        handlers
    }

    fn build(routes: RouteRegistry) -> RoutingResult<Dispatcher> {
        Dispatcher::build(
            routes,
            &middleware_registry(),
            &handlers(),
            Arc::new(Validator::new()),
            RoutingConfig::default(),
        )
    }

    #[test]
    fn test_dispatch_to_controller() {
        let mut routes = RouteRegistry::new();
        routes
            .resource("posts", "Posts", Default::default())
            .unwrap();
        let dispatcher = build(routes).unwrap();

        let result = dispatcher.dispatch(RouteType::Api, HttpMethod::GET, "/posts/12", &TestRequest::get());
        let dispatched = result.unwrap();
        assert_eq!(dispatched.route_name.as_deref(), Some("posts.show"));
        assert_eq!(dispatched.payload, json!({"action": "show", "params": {"id": "12"}}));
    }

    #[test]
    fn test_not_found_and_method_not_allowed() {
        let mut routes = RouteRegistry::new();
        routes
            .register(RouteDefinition::post(RouteType::Api, "/posts", echo_handler()))
            .unwrap();
        let dispatcher = build(routes).unwrap();

        let err = dispatcher
            .dispatch(RouteType::Api, HttpMethod::GET, "/missing", &TestRequest::get())
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = dispatcher
            .dispatch(RouteType::Api, HttpMethod::GET, "/posts", &TestRequest::get())
            .unwrap_err();
        assert!(matches!(err, DispatchError::MethodNotAllowed { ref allowed, .. } if allowed == &vec![HttpMethod::POST]));
    }

    #[test]
    fn test_build_errors() {
        let mut routes = RouteRegistry::new();
        routes
            .register(RouteDefinition::get(RouteType::Api, "/a", echo_handler()).middleware("throttle"))
            .unwrap();
        assert!(matches!(
            build(routes),
            Err(RoutingError::Middleware(crate::errors::MiddlewareError::UnknownMiddleware { .. }))
        ));

        let mut routes = RouteRegistry::new();
        routes
            .register(RouteDefinition::get(RouteType::Api, "/a", "Users@index"))
            .unwrap();
        assert!(matches!(build(routes), Err(RoutingError::UnresolvedHandler { .. })));

        let mut routes = RouteRegistry::new();
        routes
            .register(RouteDefinition::get(RouteType::Api, "/a", echo_handler()).middleware("capability"))
            .unwrap();
        assert!(matches!(
            build(routes),
            Err(RoutingError::Middleware(crate::errors::MiddlewareError::InvalidParameters { .. }))
        ));
    }

    #[test]
    fn test_strict_rules_rejected_at_build() {
        let mut routes = RouteRegistry::new();
        routes
            .register(
                RouteDefinition::post(RouteType::Api, "/a", echo_handler())
                    .rules(RuleSet::new().field("name", "required|shiny").unwrap()),
            )
            .unwrap();

        let result = Dispatcher::build(
            routes,
            &middleware_registry(),
            &handlers(),
            Arc::new(Validator::new()),
            RoutingConfig::default().strict_rules(true),
        );
        assert!(matches!(result, Err(RoutingError::Rules(_))));
    }

    #[test]
    fn test_implicit_requirements() {
        let mut routes = RouteRegistry::new();
        routes
            .register(RouteDefinition::post(RouteType::Ajax, "/like", echo_handler()))
            .unwrap()
            .register(RouteDefinition::post(RouteType::Ajax, "/ping", echo_handler()).public())
            .unwrap()
            .register(RouteDefinition::get(RouteType::Admin, "/settings", echo_handler()))
            .unwrap()
            .register(
                RouteDefinition::get(RouteType::Web, "/drafts", echo_handler())
                    .capability("edit_posts")
                    .middleware("capability:read"),
            )
            .unwrap();
        let dispatcher = build(routes).unwrap();

        assert_eq!(dispatcher.routes(RouteType::Ajax)[0].middleware, vec!["auth"]);
        assert!(dispatcher.routes(RouteType::Ajax)[1].middleware.is_empty());
        assert_eq!(
            dispatcher.routes(RouteType::Admin)[0].middleware,
            vec!["capability:manage_options"]
        );
        assert_eq!(
            dispatcher.routes(RouteType::Web)[0].middleware,
            vec!["capability:read", "capability:edit_posts"]
        );

        let err = dispatcher
            .dispatch(RouteType::Ajax, HttpMethod::POST, "/like", &TestRequest::post())
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert!(dispatcher
            .dispatch(RouteType::Ajax, HttpMethod::POST, "/ping", &TestRequest::post())
            .is_ok());

        let err = dispatcher
            .dispatch(RouteType::Admin, HttpMethod::GET, "/settings", &TestRequest::get().authenticated())
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(dispatcher
            .dispatch(
                RouteType::Admin,
                HttpMethod::GET,
                "/settings",
                &TestRequest::get().capability("manage_options"),
            )
            .is_ok());
    }

    #[test]
    fn test_global_then_group_then_route_order() {
        let log = CallLog::default();
        let mut middleware = middleware_registry();
        for name in ["global", "group", "route"] {
            middleware.register(name, RecordingMiddleware::new(name, Step::Pass).with_log(&log).factory());
        }

        let mut routes = RouteRegistry::new();
        routes
            .group(GroupAttributes::new().middleware("group"), |r| {
                r.register(RouteDefinition::get(RouteType::Api, "/x", echo_handler()).middleware("route"))?;
                Ok(())
            })
            .unwrap();

        let dispatcher = Dispatcher::build(
            routes,
            &middleware,
            &handlers(),
            Arc::new(Validator::new()),
            RoutingConfig::default().global_middleware("global"),
        )
        .unwrap();

        dispatcher
            .dispatch(RouteType::Api, HttpMethod::GET, "/x", &TestRequest::get())
            .unwrap();
        assert_eq!(log.calls(), vec!["global", "group", "route"]);
    }

    #[test]
    fn test_rejection_keeps_headers() {
        let mut middleware = middleware_registry();
        middleware.register("tag", RecordingMiddleware::new("tag", Step::Header("x-tag", "1")).factory());

        let mut routes = RouteRegistry::new();
        routes
            .register(
                RouteDefinition::get(RouteType::Api, "/x", echo_handler())
                    .middleware("tag")
                    .middleware("auth"),
            )
            .unwrap();
        let dispatcher = Dispatcher::build(
            routes,
            &middleware,
            &handlers(),
            Arc::new(Validator::new()),
            RoutingConfig::default(),
        )
        .unwrap();

        let err = dispatcher
            .dispatch(RouteType::Api, HttpMethod::GET, "/x", &TestRequest::get())
            .unwrap_err();
        match &err {
            DispatchError::MiddlewareRejected { middleware, .. } => assert_eq!(middleware, "auth"),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.headers().is_some_and(|headers| headers.contains_key("x-tag")));
    }

    #[test]
    fn test_route_rules() {
        let mut routes = RouteRegistry::new();
        routes
            .register(
                RouteDefinition::post(RouteType::Api, "/users", echo_handler())
                    .rules(RuleSet::new().field("name", "required|min:3").unwrap()),
            )
            .unwrap();
        let dispatcher = build(routes).unwrap();

        let err = dispatcher
            .dispatch(
                RouteType::Api,
                HttpMethod::POST,
                "/users",
                &TestRequest::post().json(json!({"name": ""})),
            )
            .unwrap_err();
        match err {
            DispatchError::ValidationFailed { errors, .. } => assert_eq!(errors.messages("name").len(), 2),
            other => panic!("unexpected error {:?}", other),
        }

        let ok = dispatcher
            .dispatch(
                RouteType::Api,
                HttpMethod::POST,
                "/users",
                &TestRequest::post().json(json!({"name": "Ada"})),
            )
            .unwrap();
        assert_eq!(ok.payload["input"]["name"], "Ada");
    }

    #[test]
    #[traced_test]
    fn test_handler_errors_and_panics() {
        let mut routes = RouteRegistry::new();
        routes
            .register(RouteDefinition::get(RouteType::Api, "/fail", failing_handler()))
            .unwrap()
            .register(RouteDefinition::get(RouteType::Api, "/panic", panicking_handler()))
            .unwrap();
        let dispatcher = build(routes).unwrap();

        let failed = dispatcher.dispatch(RouteType::Api, HttpMethod::GET, "/fail", &TestRequest::get());
        assert!(matches!(failed, Err(DispatchError::Handler { .. })));
        assert!(logs_contain("handler failed"));

        let panicked = dispatcher.dispatch(RouteType::Api, HttpMethod::GET, "/panic", &TestRequest::get());
        match &panicked {
            Err(DispatchError::Handler { source }) => assert!(source.to_string().contains("handler panicked")),
            other => panic!("unexpected result {:?}", other),
        }

        let envelope = dispatcher.respond(&panicked).to_json();
        assert_eq!(envelope["error"]["kind"], "handler_error");
        assert!(!envelope["error"]["message"].as_str().unwrap_or("").contains("panicked"));
    }

    #[test]
    fn test_admin_menu_and_page_metadata() {
        let mut routes = RouteRegistry::new();
        routes
            .register(
                RouteDefinition::get(RouteType::Admin, "/tools", echo_handler())
                    .name("tools")
                    .menu(MenuMeta::new("Tools")),
            )
            .unwrap()
            .register(
                RouteDefinition::get(RouteType::Admin, "/settings", echo_handler())
                    .name("settings")
                    .title("Settings")
                    .template("admin/settings.html")
                    .menu(MenuMeta::new("Settings").position(20)),
            )
            .unwrap()
            .register(
                RouteDefinition::get(RouteType::Admin, "/analytics", echo_handler())
                    .menu(MenuMeta::new("Analytics").position(20)),
            )
            .unwrap()
            .register(RouteDefinition::get(RouteType::Admin, "/hidden", echo_handler()))
            .unwrap();
        let dispatcher = build(routes).unwrap();

        let titles: Vec<String> = dispatcher
            .admin_menu()
            .into_iter()
            .map(|entry| entry.menu.menu_title)
            .collect();
        assert_eq!(titles, vec!["Analytics", "Settings", "Tools"]);

        let page = dispatcher
            .dispatch(
                RouteType::Admin,
                HttpMethod::GET,
                "/settings",
                &TestRequest::get().capability("manage_options"),
            )
            .unwrap();
        assert_eq!(page.template.as_deref(), Some("admin/settings.html"));
        assert_eq!(page.title.as_deref(), Some("Settings"));
        assert_eq!(page.menu.and_then(|menu| menu.position), Some(20));
    }
}

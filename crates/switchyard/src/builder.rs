use std::sync::Arc;
use switchyard_http::{
    register_builtins, ConfigError, Controller, Dispatcher, HandlerRegistry, Middleware, MiddlewareError,
    MiddlewareFactory, MiddlewareRegistry, MiddlewareSpec, RouteRegistry, RoutingConfig, RoutingError,
    RuleSetCatalog,
};
use switchyard_security::{register_security, SecurityConfig, SecurityError, SecurityServices};
use switchyard_validation::{Attributes, Messages, RuleSet, Validator};
use thiserror::Error;

/// Anything that can stop [`Switchyard::build`]
#[derive(Error, Debug)]
pub enum SwitchyardError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Builder wiring routes, handlers, middleware and validation into a [`Dispatcher`]
///
/// Every built-in middleware (`auth`, `capability`, `json_only`, `validate`,
/// `rate_limit`, `cors`, `nonce`) is registered at build time. Middleware
/// added with [`Switchyard::middleware`] is registered last and replaces a
/// built-in of the same name.
pub struct Switchyard {
    config: RoutingConfig,
    routes: RouteRegistry,
    handlers: HandlerRegistry,
    middleware: Vec<(String, MiddlewareFactory)>,
    catalog: RuleSetCatalog,
    validator: Validator,
    security: Option<SecurityServices>,
}

impl Switchyard {
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            config,
            routes: RouteRegistry::new(),
            handlers: HandlerRegistry::new(),
            middleware: Vec::new(),
            catalog: RuleSetCatalog::new(),
            validator: Validator::new(),
            security: None,
        }
    }

    /// Start from `SWITCHYARD_*` environment variables
    pub fn from_env() -> Result<Self, SwitchyardError> {
        Ok(Self::new(RoutingConfig::from_env()?))
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Register routes through a closure
    pub fn routes<F>(mut self, register: F) -> Result<Self, SwitchyardError>
    where
        F: FnOnce(&mut RouteRegistry) -> Result<(), RoutingError>,
    {
        register(&mut self.routes)?;
        Ok(self)
    }

    /// Make a controller addressable as `"<name>@<action>"`
    pub fn controller<C: Controller + 'static>(mut self, name: impl Into<String>, controller: C) -> Self {
        self.handlers.register(name, controller);
        self
    }

    /// Add a middleware factory
    pub fn middleware<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&MiddlewareSpec) -> Result<Arc<dyn Middleware>, MiddlewareError> + Send + Sync + 'static,
    {
        self.middleware.push((name.into(), Arc::new(factory)));
        self
    }

    /// Add a named rule set, addressable as `validate:<name>`
    pub fn rule_set(mut self, name: impl Into<String>, rules: RuleSet) -> Self {
        self.catalog.insert(name, rules);
        self
    }

    /// Add a named rule set with custom messages and attribute labels
    pub fn rule_set_with(
        mut self,
        name: impl Into<String>,
        rules: RuleSet,
        messages: Messages,
        attributes: Attributes,
    ) -> Self {
        self.catalog.insert_with(name, rules, messages, attributes);
        self
    }

    /// Use a preconfigured validator (custom rules, store); strictness
    /// is still raised by `RoutingConfig::strict_rules`
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Use these security stores instead of fresh in-memory ones
    pub fn security(mut self, services: SecurityServices) -> Self {
        self.security = Some(services);
        self
    }

    /// Resolve everything and freeze it
    pub fn build(self) -> Result<Dispatcher, SwitchyardError> {
        self.config.validate()?;

        let strict = self.config.strict_rules || self.validator.config().strict;
        let validator = Arc::new(self.validator.strict(strict));

        let mut middleware = MiddlewareRegistry::new();
        register_builtins(&mut middleware, Arc::new(self.catalog), Arc::clone(&validator));

        let security = self
            .security
            .unwrap_or_else(|| SecurityServices::in_memory(SecurityConfig::for_routing(&self.config)));
        register_security(&mut middleware, &security)?;

        for (name, factory) in self.middleware {
            middleware.register(name, move |spec: &MiddlewareSpec| factory(spec));
        }

        tracing::debug!(middleware = ?middleware.names(), "middleware registered");
        let dispatcher = Dispatcher::build(self.routes, &middleware, &self.handlers, validator, self.config)?;
        Ok(dispatcher)
    }
}

impl Default for Switchyard {
    fn default() -> Self {
        Self::new(RoutingConfig::default())
    }
}

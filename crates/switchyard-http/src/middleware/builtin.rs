//! Built-in middleware: `auth`, `capability`, `json_only` and `validate`

use super::{Middleware, MiddlewareRegistry, MiddlewareRejection, MiddlewareSpec};
use crate::errors::MiddlewareError;
use crate::request::{RequestContext, RouteContext};
use http::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use switchyard_validation::{Attributes, Messages, RuleSet, Validator};

/// Rejects unauthenticated callers with 401
#[derive(Debug, Default, Clone)]
pub struct AuthMiddleware;

impl Middleware for AuthMiddleware {
    fn name(&self) -> &str {
        "auth"
    }

    fn handle(&self, ctx: &RouteContext<'_>, _headers: &mut HeaderMap) -> Result<(), MiddlewareRejection> {
        if ctx.is_authenticated() {
            Ok(())
        } else {
            Err(MiddlewareRejection::unauthorized("Authentication required"))
        }
    }
}

/// Rejects callers lacking a capability with 403
#[derive(Debug, Clone)]
pub struct CapabilityMiddleware {
    capability: String,
}

impl CapabilityMiddleware {
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
        }
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }
}

impl Middleware for CapabilityMiddleware {
    fn name(&self) -> &str {
        "capability"
    }

    fn handle(&self, ctx: &RouteContext<'_>, _headers: &mut HeaderMap) -> Result<(), MiddlewareRejection> {
        if ctx.has_capability(&self.capability) {
            Ok(())
        } else {
            Err(MiddlewareRejection::forbidden(format!(
                "Missing capability '{}'",
                self.capability
            )))
        }
    }
}

/// Rejects requests whose body is not JSON with 415.
///
/// A request without a body and without a content type passes.
#[derive(Debug, Default, Clone)]
pub struct JsonOnlyMiddleware;

impl JsonOnlyMiddleware {
    fn is_json(content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        essence == "application/json" || essence.ends_with("+json")
    }
}

impl Middleware for JsonOnlyMiddleware {
    fn name(&self) -> &str {
        "json_only"
    }

    fn handle(&self, ctx: &RouteContext<'_>, _headers: &mut HeaderMap) -> Result<(), MiddlewareRejection> {
        match ctx.content_type() {
            Some(content_type) if Self::is_json(content_type) => Ok(()),
            None if ctx.body().is_null() => Ok(()),
            Some(content_type) => Err(MiddlewareRejection::unsupported_media_type(format!(
                "Expected a JSON request body, got '{}'",
                content_type
            ))),
            None => Err(MiddlewareRejection::unsupported_media_type(
                "Expected a JSON request body",
            )),
        }
    }
}

/// A named rule set with its message overrides
#[derive(Debug, Clone, Default)]
pub struct CatalogEntry {
    pub rules: RuleSet,
    pub messages: Messages,
    pub attributes: Attributes,
}

/// Named rule sets addressable as `validate:<name>`
#[derive(Debug, Clone, Default)]
pub struct RuleSetCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl RuleSetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, rules: RuleSet) -> &mut Self {
        self.insert_with(name, rules, Messages::new(), Attributes::new())
    }

    pub fn insert_with(
        &mut self,
        name: impl Into<String>,
        rules: RuleSet,
        messages: Messages,
        attributes: Attributes,
    ) -> &mut Self {
        self.entries.insert(
            name.into(),
            CatalogEntry {
                rules,
                messages,
                attributes,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validates the merged request input against a catalog rule set; 422 with field errors
#[derive(Debug, Clone)]
pub struct ValidateMiddleware {
    rule_set: String,
    entry: CatalogEntry,
    validator: Arc<Validator>,
}

impl ValidateMiddleware {
    pub fn new(rule_set: impl Into<String>, entry: CatalogEntry, validator: Arc<Validator>) -> Self {
        Self {
            rule_set: rule_set.into(),
            entry,
            validator,
        }
    }
}

impl Middleware for ValidateMiddleware {
    fn name(&self) -> &str {
        "validate"
    }

    fn handle(&self, ctx: &RouteContext<'_>, _headers: &mut HeaderMap) -> Result<(), MiddlewareRejection> {
        let input: Value = ctx.all();
        self.validator
            .validate_with(&input, &self.entry.rules, &self.entry.messages, &self.entry.attributes)
            .map(|_| ())
            .map_err(|errors| {
                tracing::debug!(rule_set = %self.rule_set, fields = errors.len(), "validation failed");
                MiddlewareRejection::validation(errors)
            })
    }
}

fn expect_no_params(spec: &MiddlewareSpec) -> Result<(), MiddlewareError> {
    if spec.params.is_empty() {
        Ok(())
    } else {
        Err(MiddlewareError::invalid_parameters(&spec.name, "takes no parameters"))
    }
}

fn single_param(spec: &MiddlewareSpec, what: &str) -> Result<String, MiddlewareError> {
    match spec.params.as_slice() {
        [param] => Ok(param.as_text().to_string()),
        _ => Err(MiddlewareError::invalid_parameters(
            &spec.name,
            format!("expected exactly one parameter ({})", what),
        )),
    }
}

/// Register `auth`, `capability`, `json_only` and `validate`
pub fn register_builtins(registry: &mut MiddlewareRegistry, catalog: Arc<RuleSetCatalog>, validator: Arc<Validator>) {
    registry.register("auth", |spec: &MiddlewareSpec| {
        expect_no_params(spec)?;
        Ok(Arc::new(AuthMiddleware) as Arc<dyn Middleware>)
    });

    registry.register("capability", |spec: &MiddlewareSpec| {
        let capability = single_param(spec, "capability name")?;
        Ok(Arc::new(CapabilityMiddleware::new(capability)) as Arc<dyn Middleware>)
    });

    registry.register("json_only", |spec: &MiddlewareSpec| {
        expect_no_params(spec)?;
        Ok(Arc::new(JsonOnlyMiddleware) as Arc<dyn Middleware>)
    });

    registry.register("validate", move |spec: &MiddlewareSpec| {
        let name = single_param(spec, "rule set name")?;
        let entry = catalog
            .get(&name)
            .cloned()
            .ok_or_else(|| MiddlewareError::UnknownRuleSet { name: name.clone() })?;
        if validator.config().strict {
            validator
                .check_rules(&entry.rules)
                .map_err(|e| MiddlewareError::invalid_parameters("validate", e.to_string()))?;
        }
        Ok(Arc::new(ValidateMiddleware::new(name, entry, Arc::clone(&validator))) as Arc<dyn Middleware>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{route_fixture, TestRequest};
    use http::StatusCode;
    use serde_json::json;

    fn run(middleware: &dyn Middleware, request: &TestRequest) -> Result<(), MiddlewareRejection> {
        let route = route_fixture("/x");
        let params = HashMap::new();
        let ctx = RouteContext::new(request, &route, &params);
        middleware.handle(&ctx, &mut HeaderMap::new())
    }

    fn builtins() -> MiddlewareRegistry {
        let mut catalog = RuleSetCatalog::new();
        catalog.insert("post", RuleSet::new().field("title", "required|min:3").unwrap());
        let mut registry = MiddlewareRegistry::new();
        register_builtins(&mut registry, Arc::new(catalog), Arc::new(Validator::new()));
        registry
    }

    #[test]
    fn test_auth() {
        assert!(run(&AuthMiddleware, &TestRequest::get().authenticated()).is_ok());
        let rejection = run(&AuthMiddleware, &TestRequest::get()).unwrap_err();
        assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_capability() {
        let middleware = CapabilityMiddleware::new("edit_posts");
        assert!(run(&middleware, &TestRequest::get().capability("edit_posts")).is_ok());
        let rejection = run(&middleware, &TestRequest::get().capability("read")).unwrap_err();
        assert_eq!(rejection.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_json_only() {
        let json = TestRequest::post().json(json!({"a": 1}));
        assert!(run(&JsonOnlyMiddleware, &json).is_ok());

        let vendor = TestRequest::post()
            .with_body(json!({"a": 1}))
            .header("Content-Type", "application/vnd.api+json; charset=utf-8");
        assert!(run(&JsonOnlyMiddleware, &vendor).is_ok());

        let form = TestRequest::post()
            .with_body(json!({"a": 1}))
            .header("content-type", "application/x-www-form-urlencoded");
        assert_eq!(
            run(&JsonOnlyMiddleware, &form).unwrap_err().status,
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert!(run(&JsonOnlyMiddleware, &TestRequest::get()).is_ok());
    }

    #[test]
    fn test_validate_reports_field_errors() {
        let registry = builtins();
        let middleware = registry.resolve(&MiddlewareSpec::parse("validate:post").unwrap()).unwrap();

        let rejection = run(middleware.as_ref(), &TestRequest::post().json(json!({"title": ""}))).unwrap_err();
        assert_eq!(rejection.status, StatusCode::UNPROCESSABLE_ENTITY);
        let errors = rejection.errors.unwrap();
        assert_eq!(errors.messages("title").len(), 2);

        assert!(run(middleware.as_ref(), &TestRequest::post().json(json!({"title": "Hello"}))).is_ok());
    }

    #[test]
    fn test_numeric_looking_names_are_kept_verbatim() {
        let mut catalog = RuleSetCatalog::new();
        catalog.insert("01", RuleSet::new().field("title", "required").unwrap());
        let mut registry = MiddlewareRegistry::new();
        register_builtins(&mut registry, Arc::new(catalog), Arc::new(Validator::new()));

        let validate = registry.resolve(&MiddlewareSpec::parse("validate:01").unwrap()).unwrap();
        assert!(run(validate.as_ref(), &TestRequest::post().json(json!({"title": "Hi"}))).is_ok());

        let capability = registry
            .resolve(&MiddlewareSpec::parse("capability:1.10").unwrap())
            .unwrap();
        assert!(run(capability.as_ref(), &TestRequest::get().capability("1.10")).is_ok());
        assert!(run(capability.as_ref(), &TestRequest::get().capability("1.1")).is_err());
    }

    #[test]
    fn test_builtin_parameter_checks() {
        let registry = builtins();
        for (spec, expected) in [
            ("auth:admin", "invalid"),
            ("capability", "invalid"),
            ("capability:a,b", "invalid"),
            ("json_only:1", "invalid"),
            ("validate:missing", "unknown_rule_set"),
        ] {
            let err = registry.resolve(&MiddlewareSpec::parse(spec).unwrap()).unwrap_err();
            let kind = match err {
                MiddlewareError::InvalidParameters { .. } => "invalid",
                MiddlewareError::UnknownRuleSet { .. } => "unknown_rule_set",
                _ => "other",
            };
            assert_eq!(kind, expected, "{spec}");
        }
    }
}

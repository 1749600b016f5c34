//! The validator: runs a [`RuleSet`] over JSON input

use crate::engine::{measure, RuleContext, RuleEngine};
use crate::error::{RuleParseError, ValidationError, ValidationErrors, ValidationResult};
use crate::messages::{self, Attributes, Messages};
use crate::path;
use crate::rules::{FieldRules, RuleId, RuleSet, RuleSpec};
use crate::traits::StoreQuery;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A rule registered at runtime with [`Validator::extend`]
pub type CustomRule = Arc<dyn Fn(&RuleContext<'_>) -> bool + Send + Sync>;

/// Validator behaviour switches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Report unknown rule names as errors instead of skipping them
    pub strict: bool,
}

/// Runs rule sets against input data.
///
/// A `Validator` holds no per-call state: the same instance can validate any
/// number of inputs, from any number of threads, with identical results for
/// identical inputs.
#[derive(Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
    store: Option<Arc<dyn StoreQuery>>,
    custom: HashMap<String, CustomRule>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut custom: Vec<&str> = self.custom.keys().map(String::as_str).collect();
        custom.sort_unstable();
        f.debug_struct("Validator")
            .field("config", &self.config)
            .field("store", &self.store.is_some())
            .field("custom", &custom)
            .finish()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Toggle strict handling of unknown rule names
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Attach the store consulted by `exists` and `unique`
    pub fn with_store(mut self, store: Arc<dyn StoreQuery>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Register a custom rule under `name`.
    ///
    /// Custom rules run only for present fields and report the generic
    /// `"<attribute> is invalid"` message unless the caller supplies one.
    /// Built-in names cannot be overridden.
    pub fn extend<F>(&mut self, name: impl Into<String>, rule: F) -> &mut Self
    where
        F: Fn(&RuleContext<'_>) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        if RuleId::from_name(&name).is_some() {
            tracing::warn!(rule = %name, "ignoring custom rule that shadows a built-in rule");
            return self;
        }
        self.custom.insert(name, Arc::new(rule));
        self
    }

    /// Whether `name` is a built-in or registered custom rule
    pub fn knows(&self, name: &str) -> bool {
        RuleId::from_name(name).is_some() || self.custom.contains_key(name)
    }

    /// Reject rule sets that name rules this validator cannot run
    pub fn check_rules(&self, rules: &RuleSet) -> Result<(), RuleParseError> {
        match rules
            .unknown_rules()
            .into_iter()
            .find(|(_, name)| !self.custom.contains_key(*name))
        {
            Some((field, rule)) => Err(RuleParseError::UnknownRule {
                field: field.to_string(),
                rule: rule.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Validate with default messages and labels
    pub fn validate<'a>(&self, data: &'a Value, rules: &RuleSet) -> ValidationResult<&'a Value> {
        self.validate_with(data, rules, &Messages::new(), &Attributes::new())
    }

    /// Validate `data` against `rules`.
    ///
    /// Returns the input untouched when every rule passes, otherwise every
    /// failure keyed by field in rule declaration order.
    pub fn validate_with<'a>(
        &self,
        data: &'a Value,
        rules: &RuleSet,
        messages: &Messages,
        attributes: &Attributes,
    ) -> ValidationResult<&'a Value> {
        let mut errors = ValidationErrors::new();

        for field_rules in rules.fields() {
            self.validate_field(data, field_rules, messages, attributes, &mut errors);
        }

        if errors.is_empty() {
            Ok(data)
        } else {
            tracing::debug!(
                fields = errors.len(),
                failures = errors.total_errors(),
                "validation failed"
            );
            Err(errors)
        }
    }

    fn validate_field(
        &self,
        data: &Value,
        field_rules: &FieldRules,
        messages: &Messages,
        attributes: &Attributes,
        errors: &mut ValidationErrors,
    ) {
        let field = field_rules.field.as_str();
        let value = path::resolve(data, field);
        let numeric = field_rules
            .rules
            .iter()
            .any(|spec| spec.id.is_some_and(RuleId::marks_numeric));

        for spec in &field_rules.rules {
            let ctx = RuleContext {
                field,
                value,
                params: &spec.params,
                pattern: spec.pattern.as_ref(),
                data,
                numeric,
                store: self.store.as_deref(),
            };

            let passed = match spec.id {
                Some(RuleId::Nullable) => {
                    if value.map_or(true, Value::is_null) {
                        break;
                    }
                    continue;
                }
                Some(rule) => {
                    if value.is_none() && !rule.is_implicit() {
                        continue;
                    }
                    RuleEngine::evaluate(rule, &ctx)
                }
                None => match self.custom.get(&spec.name) {
                    Some(custom) => {
                        if value.is_none() {
                            continue;
                        }
                        custom(&ctx)
                    }
                    None => {
                        self.unknown_rule(field, spec, errors);
                        continue;
                    }
                },
            };

            if !passed {
                let kind = spec
                    .id
                    .filter(|rule| rule.is_sizing())
                    .and_then(|_| value.and_then(|v| measure(v, numeric)))
                    .map(|m| m.kind());
                let template = messages::select(field, spec, kind, messages);
                let message = messages::render(template, field, spec, attributes);
                errors.add(ValidationError::with_code(field, message, spec.name.clone()));
            }
        }
    }

    fn unknown_rule(&self, field: &str, spec: &RuleSpec, errors: &mut ValidationErrors) {
        if self.config.strict {
            errors.add(ValidationError::with_code(
                field,
                format!("Unknown validation rule '{}'", spec.name),
                "unknown_rule",
            ));
        } else {
            tracing::debug!(field, rule = %spec.name, "skipping unknown validation rule");
        }
    }
}

//! Error message templates and rendering
//!
//! Lookup order for a failing rule on `field`:
//! 1. caller message keyed `field.rule`
//! 2. caller message keyed `rule`
//! 3. the default template for the rule (kind-specific for sizing rules)
//! 4. `"<attribute> is invalid"`
//!
//! Templates substitute `{attribute}`, `{other}`, `{values}` and positional
//! `{0}`, `{1}`, ... from the rule's parameters.

use crate::rules::{RuleId, RuleSpec};
use std::collections::HashMap;

/// Caller-supplied message overrides
pub type Messages = HashMap<String, String>;

/// Caller-supplied attribute labels
pub type Attributes = HashMap<String, String>;

pub const FALLBACK: &str = "{attribute} is invalid";

/// Default template for a rule; `kind` is `string`, `numeric` or `array` for sizing rules
pub fn default_template(rule: RuleId, kind: Option<&str>) -> &'static str {
    match (rule, kind.unwrap_or("string")) {
        (RuleId::Min, "numeric") => "{attribute} must be at least {0}",
        (RuleId::Min, "array") => "{attribute} must have at least {0} items",
        (RuleId::Min, _) => "{attribute} must be at least {0} characters",
        (RuleId::Max, "numeric") => "{attribute} may not be greater than {0}",
        (RuleId::Max, "array") => "{attribute} may not have more than {0} items",
        (RuleId::Max, _) => "{attribute} may not be greater than {0} characters",
        (RuleId::Between, "numeric") => "{attribute} must be between {0} and {1}",
        (RuleId::Between, "array") => "{attribute} must have between {0} and {1} items",
        (RuleId::Between, _) => "{attribute} must be between {0} and {1} characters",
        (RuleId::Size, "numeric") => "{attribute} must be {0}",
        (RuleId::Size, "array") => "{attribute} must contain {0} items",
        (RuleId::Size, _) => "{attribute} must be {0} characters",
        (rule, _) => template(rule),
    }
}

fn template(rule: RuleId) -> &'static str {
    match rule {
        RuleId::Accepted => "{attribute} must be accepted",
        RuleId::After => "{attribute} must be a date after {0}",
        RuleId::Alpha => "{attribute} may only contain letters",
        RuleId::AlphaDash => "{attribute} may only contain letters, numbers, dashes and underscores",
        RuleId::AlphaNum => "{attribute} may only contain letters and numbers",
        RuleId::Array => "{attribute} must be an array",
        RuleId::Before => "{attribute} must be a date before {0}",
        RuleId::Boolean => "{attribute} must be true or false",
        RuleId::Confirmed => "{attribute} confirmation does not match",
        RuleId::Date => "{attribute} is not a valid date",
        RuleId::DateFormat => "{attribute} does not match the format {0}",
        RuleId::Different => "{attribute} and {other} must be different",
        RuleId::Digits => "{attribute} must be {0} digits",
        RuleId::DigitsBetween => "{attribute} must be between {0} and {1} digits",
        RuleId::Email => "{attribute} must be a valid email address",
        RuleId::Exists => "The selected {attribute} is invalid",
        RuleId::Filled => "{attribute} must have a value",
        RuleId::In => "The selected {attribute} is invalid",
        RuleId::Integer => "{attribute} must be an integer",
        RuleId::Ip => "{attribute} must be a valid IP address",
        RuleId::Json => "{attribute} must be a valid JSON string",
        RuleId::NotIn => "The selected {attribute} is invalid",
        RuleId::NotRegex => "{attribute} format is invalid",
        RuleId::Numeric => "{attribute} must be a number",
        RuleId::Present => "{attribute} must be present",
        RuleId::Regex => "{attribute} format is invalid",
        RuleId::Required => "{attribute} is required",
        RuleId::RequiredIf => "{attribute} is required when {other} is {values}",
        RuleId::RequiredUnless => "{attribute} is required unless {other} is in {values}",
        RuleId::RequiredWith => "{attribute} is required when {values} is present",
        RuleId::RequiredWithAll => "{attribute} is required when {values} are present",
        RuleId::RequiredWithout => "{attribute} is required when {values} is not present",
        RuleId::RequiredWithoutAll => "{attribute} is required when none of {values} are present",
        RuleId::Same => "{attribute} and {other} must match",
        RuleId::String => "{attribute} must be a string",
        RuleId::Unique => "{attribute} has already been taken",
        RuleId::Url => "{attribute} format is invalid",
        RuleId::Uuid => "{attribute} must be a valid UUID",
        // Sizing rules are covered above; nullable never fails
        RuleId::Min | RuleId::Max | RuleId::Between | RuleId::Size | RuleId::Nullable => FALLBACK,
    }
}

/// Human label for a field: the caller's attribute label, else the path with
/// `_` and `.` turned into spaces
pub fn label(field: &str, attributes: &Attributes) -> String {
    attributes
        .get(field)
        .cloned()
        .unwrap_or_else(|| field.replace(['_', '.'], " "))
}

/// Pick the message template for a failed rule
pub fn select<'m>(
    field: &str,
    spec: &RuleSpec,
    kind: Option<&str>,
    messages: &'m Messages,
) -> &'m str {
    if let Some(custom) = messages.get(&format!("{}.{}", field, spec.name)) {
        return custom;
    }
    if let Some(custom) = messages.get(&spec.name) {
        return custom;
    }
    match spec.id {
        Some(rule) => default_template(rule, kind),
        None => FALLBACK,
    }
}

/// Fill placeholders in `template` for a failed `spec` on `field`
pub fn render(template: &str, field: &str, spec: &RuleSpec, attributes: &Attributes) -> String {
    let mut message = template.replace("{attribute}", &label(field, attributes));

    if message.contains("{other}") {
        let other = spec
            .params
            .first()
            .map(|p| label(p, attributes))
            .unwrap_or_default();
        message = message.replace("{other}", &other);
    }

    if message.contains("{values}") {
        message = message.replace("{values}", &values(spec, attributes));
    }

    for (index, param) in spec.params.iter().enumerate() {
        message = message.replace(&format!("{{{}}}", index), param);
    }

    message
}

/// The parameter list as shown to users; rules that name another field first
/// show only the remaining values, rules that list fields show their labels
fn values(spec: &RuleSpec, attributes: &Attributes) -> String {
    match spec.id {
        Some(RuleId::RequiredIf | RuleId::RequiredUnless) => spec.params[1..].join(", "),
        Some(
            RuleId::RequiredWith
            | RuleId::RequiredWithAll
            | RuleId::RequiredWithout
            | RuleId::RequiredWithoutAll,
        ) => spec
            .params
            .iter()
            .map(|p| label(p, attributes))
            .collect::<Vec<_>>()
            .join(" / "),
        _ => spec.params.join(", "),
    }
}

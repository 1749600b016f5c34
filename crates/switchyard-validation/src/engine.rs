//! Rule evaluation primitives
//!
//! Each built-in rule is a plain function `fn(&RuleContext) -> bool`. The
//! table below maps the closed [`RuleId`] catalogue onto those functions.

use crate::path;
use crate::rules::RuleId;
use crate::traits::StoreQuery;
use crate::validators::{comparison, date, format, numeric, required, size, store};
use regex::Regex;
use serde_json::Value;

static NULL: Value = Value::Null;

/// Signature shared by every built-in rule
pub type RuleFn = fn(&RuleContext<'_>) -> bool;

/// Everything a rule may look at while judging one field
pub struct RuleContext<'a> {
    /// Dot-path of the field under validation
    pub field: &'a str,
    /// The field's value; `None` when the key is missing
    pub value: Option<&'a Value>,
    /// Rule parameters in declaration order
    pub params: &'a [String],
    /// Pre-compiled pattern for `regex` / `not_regex`
    pub pattern: Option<&'a Regex>,
    /// The whole input, for cross-field rules
    pub data: &'a Value,
    /// The field also carries `numeric` or `integer`
    pub numeric: bool,
    /// Backing store for `exists` / `unique`
    pub store: Option<&'a dyn StoreQuery>,
}

impl<'a> RuleContext<'a> {
    /// Resolve another field through the same dot-path resolver
    pub fn sibling(&self, path: &str) -> Option<&'a Value> {
        path::resolve(self.data, path)
    }

    pub fn param(&self, index: usize) -> Option<&'a str> {
        self.params.get(index).map(String::as_str)
    }

    pub fn param_f64(&self, index: usize) -> Option<f64> {
        self.param(index).and_then(|p| p.parse().ok())
    }

    /// The value, treating a missing key as JSON null
    pub fn value_or_null(&self) -> &'a Value {
        self.value.unwrap_or(&NULL)
    }
}

/// Closed dispatch table from rule identifiers to rule functions
pub struct RuleEngine;

impl RuleEngine {
    /// The function implementing `rule`
    pub fn lookup(rule: RuleId) -> RuleFn {
        match rule {
            RuleId::Accepted => required::accepted,
            RuleId::After => date::after,
            RuleId::Alpha => format::alpha,
            RuleId::AlphaDash => format::alpha_dash,
            RuleId::AlphaNum => format::alpha_num,
            RuleId::Array => format::array,
            RuleId::Before => date::before,
            RuleId::Between => size::between,
            RuleId::Boolean => numeric::boolean,
            RuleId::Confirmed => comparison::confirmed,
            RuleId::Date => date::date,
            RuleId::DateFormat => date::date_format,
            RuleId::Different => comparison::different,
            RuleId::Digits => size::digits,
            RuleId::DigitsBetween => size::digits_between,
            RuleId::Email => format::email,
            RuleId::Exists => store::exists,
            RuleId::Filled => required::filled,
            RuleId::In => comparison::in_list,
            RuleId::Integer => numeric::integer,
            RuleId::Ip => format::ip,
            RuleId::Json => format::json,
            RuleId::Max => size::max,
            RuleId::Min => size::min,
            RuleId::NotIn => comparison::not_in_list,
            RuleId::NotRegex => format::not_regex,
            RuleId::Nullable => required::nullable,
            RuleId::Numeric => numeric::numeric,
            RuleId::Present => required::present,
            RuleId::Regex => format::regex,
            RuleId::Required => required::required,
            RuleId::RequiredIf => required::required_if,
            RuleId::RequiredUnless => required::required_unless,
            RuleId::RequiredWith => required::required_with,
            RuleId::RequiredWithAll => required::required_with_all,
            RuleId::RequiredWithout => required::required_without,
            RuleId::RequiredWithoutAll => required::required_without_all,
            RuleId::Same => comparison::same,
            RuleId::Size => size::size,
            RuleId::String => format::string,
            RuleId::Unique => store::unique,
            RuleId::Url => format::url,
            RuleId::Uuid => format::uuid,
        }
    }

    /// Evaluate one rule; `true` means the value passes
    pub fn evaluate(rule: RuleId, ctx: &RuleContext<'_>) -> bool {
        (Self::lookup(rule))(ctx)
    }
}

/// How a value is measured by the sizing rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    /// Character count of a string
    Length(f64),
    /// Numeric magnitude
    Magnitude(f64),
    /// Element count of an array or object
    Count(f64),
}

impl Measure {
    pub fn amount(self) -> f64 {
        match self {
            Measure::Length(n) | Measure::Magnitude(n) | Measure::Count(n) => n,
        }
    }

    /// Suffix used to pick a kind-specific message template
    pub fn kind(self) -> &'static str {
        match self {
            Measure::Length(_) => "string",
            Measure::Magnitude(_) => "numeric",
            Measure::Count(_) => "array",
        }
    }
}

/// Measure a value for `min`/`max`/`between`/`size`.
///
/// Strings are measured by length, numbers by magnitude and lists by element
/// count. A numeric string counts as a number only when the field is also
/// declared `numeric` or `integer`. Anything else cannot be measured.
pub fn measure(value: &Value, numeric_hint: bool) -> Option<Measure> {
    match value {
        Value::String(s) => {
            if numeric_hint {
                if let Ok(n) = s.trim().parse::<f64>() {
                    return Some(Measure::Magnitude(n));
                }
            }
            Some(Measure::Length(s.chars().count() as f64))
        }
        Value::Number(n) => n.as_f64().map(Measure::Magnitude),
        Value::Array(items) => Some(Measure::Count(items.len() as f64)),
        Value::Object(map) => Some(Measure::Count(map.len() as f64)),
        _ => None,
    }
}

/// Whether a value counts as empty for presence checks
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}

/// Scalar value rendered as text for list and store comparisons
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

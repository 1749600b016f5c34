//! Sizing rules: `min`, `max`, `between`, `size`, `digits`, `digits_between`

use crate::engine::{measure, RuleContext};
use serde_json::Value;

fn amount(ctx: &RuleContext<'_>) -> Option<f64> {
    ctx.value.and_then(|value| measure(value, ctx.numeric)).map(|m| m.amount())
}

pub fn min(ctx: &RuleContext<'_>) -> bool {
    match (amount(ctx), ctx.param_f64(0)) {
        (Some(actual), Some(min)) => actual >= min,
        _ => false,
    }
}

pub fn max(ctx: &RuleContext<'_>) -> bool {
    match (amount(ctx), ctx.param_f64(0)) {
        (Some(actual), Some(max)) => actual <= max,
        _ => false,
    }
}

pub fn between(ctx: &RuleContext<'_>) -> bool {
    match (amount(ctx), ctx.param_f64(0), ctx.param_f64(1)) {
        (Some(actual), Some(min), Some(max)) => actual >= min && actual <= max,
        _ => false,
    }
}

pub fn size(ctx: &RuleContext<'_>) -> bool {
    match (amount(ctx), ctx.param_f64(0)) {
        (Some(actual), Some(expected)) => (actual - expected).abs() < f64::EPSILON,
        _ => false,
    }
}

/// Digit count of an all-digit string or a non-negative integer
fn digit_count(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => Some(s.len()),
        Value::Number(n) => n.as_u64().map(|n| n.to_string().len()),
        _ => None,
    }
}

pub fn digits(ctx: &RuleContext<'_>) -> bool {
    match (digit_count(ctx.value), ctx.param_f64(0)) {
        (Some(count), Some(expected)) => count as f64 == expected,
        _ => false,
    }
}

pub fn digits_between(ctx: &RuleContext<'_>) -> bool {
    match (digit_count(ctx.value), ctx.param_f64(0), ctx.param_f64(1)) {
        (Some(count), Some(min), Some(max)) => (count as f64) >= min && (count as f64) <= max,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{passes, passes_with};
    use serde_json::json;

    #[test]
    fn test_min_measures_strings_by_length() {
        assert!(passes(&json!({"name": "Ada"}), "name", "min:3"));
        assert!(!passes(&json!({"name": "Al"}), "name", "min:3"));
        assert!(!passes(&json!({"name": ""}), "name", "min:3"));
    }

    #[test]
    fn test_numeric_strings_need_the_numeric_hint() {
        let data = json!({"age": "42"});
        assert!(!passes(&data, "age", "min:18"));
        assert!(passes_with(&data, "age", "min:18", true));
    }

    #[test]
    fn test_max_and_between_on_numbers_and_lists() {
        assert!(passes(&json!({"qty": 5}), "qty", "max:10"));
        assert!(!passes(&json!({"qty": 11}), "qty", "max:10"));
        assert!(passes(&json!({"qty": 2.5}), "qty", "between:1,3"));
        assert!(passes(&json!({"tags": ["a", "b"]}), "tags", "between:1,2"));
        assert!(!passes(&json!({"tags": []}), "tags", "between:1,2"));
    }

    #[test]
    fn test_size() {
        assert!(passes(&json!({"code": "ABCD"}), "code", "size:4"));
        assert!(!passes(&json!({"code": "ABC"}), "code", "size:4"));
        assert!(passes(&json!({"items": [1, 2]}), "items", "size:2"));
    }

    #[test]
    fn test_unmeasurable_values_fail() {
        assert!(!passes(&json!({"flag": true}), "flag", "min:1"));
        assert!(!passes(&json!({"flag": null}), "flag", "max:1"));
    }

    #[test]
    fn test_digits() {
        assert!(passes(&json!({"pin": "0042"}), "pin", "digits:4"));
        assert!(passes(&json!({"pin": 1234}), "pin", "digits:4"));
        assert!(!passes(&json!({"pin": "12a4"}), "pin", "digits:4"));
        assert!(!passes(&json!({"pin": -123}), "pin", "digits:3"));
        assert!(passes(&json!({"zip": "12345"}), "zip", "digits_between:4,6"));
        assert!(!passes(&json!({"zip": "123"}), "zip", "digits_between:4,6"));
    }
}

//! Value comparison rules: `confirmed`, `same`, `different`, `in`, `not_in`

use crate::engine::{as_text, RuleContext};
use serde_json::Value;

/// Compare a value to a rule parameter the way form input compares:
/// `"1"`, `1` and `true` are interchangeable, as are `"0"`, `0` and `false`.
pub(crate) fn loosely_equals(value: &Value, candidate: &str) -> bool {
    match value {
        Value::Bool(flag) => match candidate {
            "true" | "1" => *flag,
            "false" | "0" => !*flag,
            _ => false,
        },
        Value::Number(n) => match (n.as_f64(), candidate.parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => n.to_string() == candidate,
        },
        other => as_text(other).is_some_and(|text| text == candidate),
    }
}

pub fn confirmed(ctx: &RuleContext<'_>) -> bool {
    let confirmation = ctx.sibling(&format!("{}_confirmation", ctx.field));
    matches!((ctx.value, confirmation), (Some(value), Some(other)) if value == other)
}

pub fn same(ctx: &RuleContext<'_>) -> bool {
    let other = ctx.param(0).and_then(|p| ctx.sibling(p));
    matches!((ctx.value, other), (Some(value), Some(other)) if value == other)
}

pub fn different(ctx: &RuleContext<'_>) -> bool {
    let other = ctx.param(0).and_then(|p| ctx.sibling(p));
    ctx.value != other
}

fn listed(ctx: &RuleContext<'_>, value: &Value) -> bool {
    ctx.params.iter().any(|candidate| loosely_equals(value, candidate))
}

pub fn in_list(ctx: &RuleContext<'_>) -> bool {
    match ctx.value_or_null() {
        Value::Array(items) => items.iter().all(|item| listed(ctx, item)),
        value => listed(ctx, value),
    }
}

pub fn not_in_list(ctx: &RuleContext<'_>) -> bool {
    match ctx.value_or_null() {
        Value::Array(items) => !items.iter().any(|item| listed(ctx, item)),
        value => !listed(ctx, value),
    }
}

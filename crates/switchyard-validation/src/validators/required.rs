//! Presence rules: `required`, its conditional variants, `present`, `filled`,
//! `accepted` and `nullable`

use super::comparison::loosely_equals;
use crate::engine::{is_empty, RuleContext};
use serde_json::Value;

pub fn required(ctx: &RuleContext<'_>) -> bool {
    ctx.value.is_some_and(|value| !is_empty(value))
}

pub fn present(ctx: &RuleContext<'_>) -> bool {
    ctx.value.is_some()
}

/// Must not be empty when present; absent is fine
pub fn filled(ctx: &RuleContext<'_>) -> bool {
    ctx.value.map_or(true, |value| !is_empty(value))
}

/// Marker rule, handled by the validator's short-circuit
pub fn nullable(_ctx: &RuleContext<'_>) -> bool {
    true
}

pub fn accepted(ctx: &RuleContext<'_>) -> bool {
    match ctx.value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "yes" | "on" | "1" | "true"
        ),
        _ => false,
    }
}

fn sibling_filled(ctx: &RuleContext<'_>, path: &str) -> bool {
    ctx.sibling(path).is_some_and(|value| !is_empty(value))
}

/// Whether the field named by the first parameter equals any of the rest
fn other_matches(ctx: &RuleContext<'_>) -> bool {
    let Some(other) = ctx.param(0) else {
        return false;
    };
    let Some(actual) = ctx.sibling(other) else {
        return false;
    };
    ctx.params[1..]
        .iter()
        .any(|candidate| loosely_equals(actual, candidate))
}

pub fn required_if(ctx: &RuleContext<'_>) -> bool {
    !other_matches(ctx) || required(ctx)
}

pub fn required_unless(ctx: &RuleContext<'_>) -> bool {
    other_matches(ctx) || required(ctx)
}

pub fn required_with(ctx: &RuleContext<'_>) -> bool {
    let triggered = ctx.params.iter().any(|p| sibling_filled(ctx, p));
    !triggered || required(ctx)
}

pub fn required_with_all(ctx: &RuleContext<'_>) -> bool {
    let triggered = ctx.params.iter().all(|p| sibling_filled(ctx, p));
    !triggered || required(ctx)
}

pub fn required_without(ctx: &RuleContext<'_>) -> bool {
    let triggered = ctx.params.iter().any(|p| !sibling_filled(ctx, p));
    !triggered || required(ctx)
}

pub fn required_without_all(ctx: &RuleContext<'_>) -> bool {
    let triggered = ctx.params.iter().all(|p| !sibling_filled(ctx, p));
    !triggered || required(ctx)
}

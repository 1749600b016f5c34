//! Type rules for numbers and booleans

use crate::engine::RuleContext;
use serde_json::Value;

pub fn numeric(ctx: &RuleContext<'_>) -> bool {
    match ctx.value {
        Some(Value::Number(_)) => true,
        Some(Value::String(s)) => {
            let s = s.trim();
            !s.is_empty() && s.parse::<f64>().is_ok_and(f64::is_finite)
        }
        _ => false,
    }
}

pub fn integer(ctx: &RuleContext<'_>) -> bool {
    match ctx.value {
        Some(Value::Number(n)) => n.is_i64() || n.is_u64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

pub fn boolean(ctx: &RuleContext<'_>) -> bool {
    match ctx.value {
        Some(Value::Bool(_)) => true,
        Some(Value::Number(n)) => matches!(n.as_i64(), Some(0 | 1)),
        Some(Value::String(s)) => matches!(s.as_str(), "0" | "1" | "true" | "false"),
        _ => false,
    }
}

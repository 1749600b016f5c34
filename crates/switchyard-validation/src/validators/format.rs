//! Shape rules: strings, lists, character classes and well-known formats

use crate::engine::{as_text, RuleContext};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::net::IpAddr;

// ASCII local part and domain, TLD of at least two letters, no leading or
// trailing dots on either side.
static EMAIL: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9]([a-zA-Z0-9._%+-]*[a-zA-Z0-9])?@[a-zA-Z0-9]([a-zA-Z0-9.-]*[a-zA-Z0-9])?\.[a-zA-Z]{2,}$",
    )
    .ok()
});

fn text<'a>(ctx: &RuleContext<'a>) -> Option<&'a str> {
    ctx.value.and_then(Value::as_str)
}

pub fn string(ctx: &RuleContext<'_>) -> bool {
    matches!(ctx.value, Some(Value::String(_)))
}

/// Lists and keyed maps both count as arrays
pub fn array(ctx: &RuleContext<'_>) -> bool {
    matches!(ctx.value, Some(Value::Array(_) | Value::Object(_)))
}

pub fn alpha(ctx: &RuleContext<'_>) -> bool {
    text(ctx).is_some_and(|s| !s.is_empty() && s.chars().all(char::is_alphabetic))
}

pub fn alpha_num(ctx: &RuleContext<'_>) -> bool {
    text(ctx).is_some_and(|s| !s.is_empty() && s.chars().all(char::is_alphanumeric))
}

pub fn alpha_dash(ctx: &RuleContext<'_>) -> bool {
    text(ctx).is_some_and(|s| {
        !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    })
}

pub fn email(ctx: &RuleContext<'_>) -> bool {
    let Some(address) = text(ctx) else {
        return false;
    };
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    if local.len() > 64 || domain.len() > 255 || address.contains("..") {
        return false;
    }
    EMAIL.as_ref().is_some_and(|pattern| pattern.is_match(address))
}

pub fn url(ctx: &RuleContext<'_>) -> bool {
    text(ctx)
        .and_then(|s| url::Url::parse(s).ok())
        .is_some_and(|parsed| parsed.has_host())
}

pub fn ip(ctx: &RuleContext<'_>) -> bool {
    text(ctx).is_some_and(|s| s.parse::<IpAddr>().is_ok())
}

pub fn uuid(ctx: &RuleContext<'_>) -> bool {
    text(ctx).is_some_and(|s| uuid::Uuid::parse_str(s).is_ok())
}

/// A string holding a well-formed JSON document
pub fn json(ctx: &RuleContext<'_>) -> bool {
    text(ctx).is_some_and(|s| serde_json::from_str::<Value>(s).is_ok())
}

fn pattern_matches(ctx: &RuleContext<'_>) -> Option<bool> {
    let pattern = ctx.pattern?;
    let subject = as_text(ctx.value?)?;
    Some(pattern.is_match(&subject))
}

pub fn regex(ctx: &RuleContext<'_>) -> bool {
    pattern_matches(ctx).unwrap_or(false)
}

pub fn not_regex(ctx: &RuleContext<'_>) -> bool {
    pattern_matches(ctx).is_some_and(|matched| !matched)
}

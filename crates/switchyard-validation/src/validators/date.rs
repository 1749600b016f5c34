//! Date rules: `date`, `date_format`, `before`, `after`

use crate::engine::RuleContext;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse the date forms accepted in input and in rule parameters
pub fn parse_date(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    let midnight = |date: NaiveDate| date.and_time(NaiveTime::MIN);
    let today = Utc::now().date_naive();

    match input {
        "now" => return Some(Utc::now().naive_utc()),
        "today" => return Some(midnight(today)),
        "tomorrow" => return Some(midnight(today + Duration::days(1))),
        "yesterday" => return Some(midnight(today - Duration::days(1))),
        _ => {}
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(input, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok().map(midnight)
}

fn value_date(value: Option<&Value>) -> Option<NaiveDateTime> {
    value.and_then(Value::as_str).and_then(parse_date)
}

/// The comparison point: a sibling field's date if one exists, else the literal
fn reference_date(ctx: &RuleContext<'_>) -> Option<NaiveDateTime> {
    let param = ctx.param(0)?;
    match ctx.sibling(param) {
        Some(other) => value_date(Some(other)),
        None => parse_date(param),
    }
}

pub fn date(ctx: &RuleContext<'_>) -> bool {
    value_date(ctx.value).is_some()
}

pub fn date_format(ctx: &RuleContext<'_>) -> bool {
    let (Some(input), Some(format)) = (ctx.value.and_then(Value::as_str), ctx.param(0)) else {
        return false;
    };
    NaiveDateTime::parse_from_str(input, format).is_ok()
        || NaiveDate::parse_from_str(input, format).is_ok()
        || NaiveTime::parse_from_str(input, format).is_ok()
}

pub fn before(ctx: &RuleContext<'_>) -> bool {
    match (value_date(ctx.value), reference_date(ctx)) {
        (Some(value), Some(reference)) => value < reference,
        _ => false,
    }
}

pub fn after(ctx: &RuleContext<'_>) -> bool {
    match (value_date(ctx.value), reference_date(ctx)) {
        (Some(value), Some(reference)) => value > reference,
        _ => false,
    }
}

//! Typed middleware specs
//!
//! `"rate_limit:10,60"` parses into the name `rate_limit` and two integer
//! parameters. Specs are parsed when a route or group is
//! registered, so a malformed spec never reaches the dispatcher.

use crate::errors::MiddlewareError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One middleware parameter
///
/// Numeric parameters keep the text they were written as, so `nonce:007`
/// still names the action `007`.
#[derive(Debug, Clone, PartialEq)]
pub enum MiddlewareParam {
    Int { value: i64, raw: String },
    Float { value: f64, raw: String },
    Text(String),
}

impl MiddlewareParam {
    /// Type a raw parameter: integers first, then floats, else text
    pub fn parse(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<i64>() {
            return MiddlewareParam::Int {
                value,
                raw: raw.to_string(),
            };
        }
        if raw.contains('.') {
            if let Ok(value) = raw.parse::<f64>() {
                return MiddlewareParam::Float {
                    value,
                    raw: raw.to_string(),
                };
            }
        }
        MiddlewareParam::Text(raw.to_string())
    }

    /// A text parameter, never typed as a number
    pub fn text(value: impl Into<String>) -> Self {
        MiddlewareParam::Text(value.into())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MiddlewareParam::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Non-negative integer parameter
    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().and_then(|n| u64::try_from(n).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MiddlewareParam::Int { value, .. } => Some(*value as f64),
            MiddlewareParam::Float { value, .. } => Some(*value),
            MiddlewareParam::Text(_) => None,
        }
    }

    /// The parameter exactly as written, whatever its type
    pub fn as_text(&self) -> &str {
        match self {
            MiddlewareParam::Int { raw, .. } | MiddlewareParam::Float { raw, .. } => raw.as_str(),
            MiddlewareParam::Text(s) => s.as_str(),
        }
    }
}

impl fmt::Display for MiddlewareParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

/// A parsed middleware reference: name plus ordered parameters
#[derive(Debug, Clone, PartialEq)]
pub struct MiddlewareSpec {
    pub name: String,
    pub params: Vec<MiddlewareParam>,
}

impl MiddlewareSpec {
    /// Parse `"name"` or `"name:p1,p2"`
    pub fn parse(spec: &str) -> Result<Self, MiddlewareError> {
        let trimmed = spec.trim();
        let (name, raw_params) = match trimmed.split_once(':') {
            Some((name, rest)) => (name.trim(), Some(rest)),
            None => (trimmed, None),
        };

        if name.is_empty() {
            return Err(MiddlewareError::malformed(spec, "empty middleware name"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(MiddlewareError::malformed(spec, "invalid character in middleware name"));
        }

        let params = match raw_params {
            None => Vec::new(),
            Some(rest) if rest.trim().is_empty() => {
                return Err(MiddlewareError::malformed(spec, "':' must be followed by parameters"));
            }
            Some(rest) => rest
                .split(',')
                .map(|raw| {
                    let raw = raw.trim();
                    if raw.is_empty() {
                        Err(MiddlewareError::malformed(spec, "empty parameter"))
                    } else {
                        Ok(MiddlewareParam::parse(raw))
                    }
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(MiddlewareSpec {
            name: name.to_string(),
            params,
        })
    }

    /// Parse a list of specs, failing on the first malformed one
    pub fn parse_all<S: AsRef<str>>(specs: &[S]) -> Result<Vec<Self>, MiddlewareError> {
        specs.iter().map(|spec| Self::parse(spec.as_ref())).collect()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn param(&self, index: usize) -> Option<&MiddlewareParam> {
        self.params.get(index)
    }
}

impl FromStr for MiddlewareSpec {
    type Err = MiddlewareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MiddlewareSpec::parse(s)
    }
}

impl fmt::Display for MiddlewareSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
            write!(f, ":{}", params.join(","))?;
        }
        Ok(())
    }
}

impl Serialize for MiddlewareSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Concatenate middleware lists, keeping the first occurrence of each name
pub fn dedup_by_name<'a, I>(lists: I) -> Vec<MiddlewareSpec>
where
    I: IntoIterator<Item = &'a [MiddlewareSpec]>,
{
    let mut merged: Vec<MiddlewareSpec> = Vec::new();
    for spec in lists.into_iter().flatten() {
        if !merged.iter().any(|existing| existing.name == spec.name) {
            merged.push(spec.clone());
        }
    }
    merged
}

/// The chain for a dispatched route: global, then group (outer to inner), then route
pub fn effective_middleware(
    global: &[MiddlewareSpec],
    group: &[MiddlewareSpec],
    route: &[MiddlewareSpec],
) -> Vec<MiddlewareSpec> {
    dedup_by_name([global, group, route])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(specs: &[MiddlewareSpec]) -> Vec<String> {
        specs.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_bare_and_parameterised_specs() {
        let spec = MiddlewareSpec::parse("auth").unwrap();
        assert_eq!(spec.name, "auth");
        assert!(spec.params.is_empty());

        let spec = MiddlewareSpec::parse("rate_limit:10, 60").unwrap();
        assert_eq!(spec.name, "rate_limit");
        assert_eq!(spec.params, vec![MiddlewareParam::parse("10"), MiddlewareParam::parse("60")]);
        assert_eq!(spec.params[1].as_u64(), Some(60));
    }

    #[test]
    fn test_parameter_typing() {
        let spec = MiddlewareSpec::parse("custom:3,2.5,edit_posts,-1").unwrap();
        let typed: Vec<(Option<i64>, Option<f64>, &str)> = spec
            .params
            .iter()
            .map(|p| (p.as_i64(), p.as_f64(), p.as_text()))
            .collect();
        assert_eq!(
            typed,
            vec![
                (Some(3), Some(3.0), "3"),
                (None, Some(2.5), "2.5"),
                (None, None, "edit_posts"),
                (Some(-1), Some(-1.0), "-1"),
            ]
        );
        assert_eq!(spec.params[3].as_u64(), None);
        assert_eq!(spec.params[0].as_f64(), Some(3.0));
    }

    #[test]
    fn test_malformed_specs() {
        for bad in ["", ":10", "rate_limit:", "rate_limit:10,", "rate_limit:,60", "bad name"] {
            assert!(
                matches!(MiddlewareSpec::parse(bad), Err(MiddlewareError::MalformedSpec { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_numeric_looking_params_keep_their_text() {
        for raw in ["nonce:007", "validate:01", "capability:1.10", "rate_limit:+5,60"] {
            assert_eq!(MiddlewareSpec::parse(raw).unwrap().to_string(), raw);
        }

        let spec = MiddlewareSpec::parse("nonce:007").unwrap();
        assert_eq!(spec.params[0].as_i64(), Some(7));
        assert_eq!(spec.params[0].as_text(), "007");
        assert_ne!(spec, MiddlewareSpec::parse("nonce:7").unwrap());
    }

    #[test]
    fn test_display_round_trip() {
        let spec: MiddlewareSpec = "cors:https://a.example".parse().unwrap();
        assert_eq!(spec.to_string(), "cors:https://a.example");
        assert_eq!(MiddlewareSpec::parse("nonce:save_post").unwrap().to_string(), "nonce:save_post");
    }

    #[test]
    fn test_effective_middleware_keeps_first_occurrence() {
        let global = MiddlewareSpec::parse_all(&["cors"]).unwrap();
        let group = MiddlewareSpec::parse_all(&["auth", "rate_limit:10,60"]).unwrap();
        let route = MiddlewareSpec::parse_all(&["rate_limit:1,1", "json_only", "cors:x"]).unwrap();

        let chain = effective_middleware(&global, &group, &route);
        assert_eq!(names(&chain), vec!["cors", "auth", "rate_limit:10,60", "json_only"]);
    }
}

//! Rule identifiers, rule specs and rule sets
//!
//! A rule token is either `name` or `name:p1,p2,...`; a rule string joins
//! tokens with `|`. Names are resolved against the closed [`RuleId`]
//! catalogue when the set is built, so the engine never dispatches on raw
//! strings. Names outside the catalogue are kept as-is: they may be custom
//! rules registered on a `Validator`, and are otherwise skipped.

use crate::error::RuleParseError;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Every rule the engine implements natively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleId {
    Accepted,
    After,
    Alpha,
    AlphaDash,
    AlphaNum,
    Array,
    Before,
    Between,
    Boolean,
    Confirmed,
    Date,
    DateFormat,
    Different,
    Digits,
    DigitsBetween,
    Email,
    Exists,
    Filled,
    In,
    Integer,
    Ip,
    Json,
    Max,
    Min,
    NotIn,
    NotRegex,
    Nullable,
    Numeric,
    Present,
    Regex,
    Required,
    RequiredIf,
    RequiredUnless,
    RequiredWith,
    RequiredWithAll,
    RequiredWithout,
    RequiredWithoutAll,
    Same,
    Size,
    String,
    Unique,
    Url,
    Uuid,
}

impl RuleId {
    pub const ALL: &'static [RuleId] = &[
        RuleId::Accepted,
        RuleId::After,
        RuleId::Alpha,
        RuleId::AlphaDash,
        RuleId::AlphaNum,
        RuleId::Array,
        RuleId::Before,
        RuleId::Between,
        RuleId::Boolean,
        RuleId::Confirmed,
        RuleId::Date,
        RuleId::DateFormat,
        RuleId::Different,
        RuleId::Digits,
        RuleId::DigitsBetween,
        RuleId::Email,
        RuleId::Exists,
        RuleId::Filled,
        RuleId::In,
        RuleId::Integer,
        RuleId::Ip,
        RuleId::Json,
        RuleId::Max,
        RuleId::Min,
        RuleId::NotIn,
        RuleId::NotRegex,
        RuleId::Nullable,
        RuleId::Numeric,
        RuleId::Present,
        RuleId::Regex,
        RuleId::Required,
        RuleId::RequiredIf,
        RuleId::RequiredUnless,
        RuleId::RequiredWith,
        RuleId::RequiredWithAll,
        RuleId::RequiredWithout,
        RuleId::RequiredWithoutAll,
        RuleId::Same,
        RuleId::Size,
        RuleId::String,
        RuleId::Unique,
        RuleId::Url,
        RuleId::Uuid,
    ];

    /// The rule's name as written in rule strings
    pub fn name(self) -> &'static str {
        match self {
            RuleId::Accepted => "accepted",
            RuleId::After => "after",
            RuleId::Alpha => "alpha",
            RuleId::AlphaDash => "alpha_dash",
            RuleId::AlphaNum => "alpha_num",
            RuleId::Array => "array",
            RuleId::Before => "before",
            RuleId::Between => "between",
            RuleId::Boolean => "boolean",
            RuleId::Confirmed => "confirmed",
            RuleId::Date => "date",
            RuleId::DateFormat => "date_format",
            RuleId::Different => "different",
            RuleId::Digits => "digits",
            RuleId::DigitsBetween => "digits_between",
            RuleId::Email => "email",
            RuleId::Exists => "exists",
            RuleId::Filled => "filled",
            RuleId::In => "in",
            RuleId::Integer => "integer",
            RuleId::Ip => "ip",
            RuleId::Json => "json",
            RuleId::Max => "max",
            RuleId::Min => "min",
            RuleId::NotIn => "not_in",
            RuleId::NotRegex => "not_regex",
            RuleId::Nullable => "nullable",
            RuleId::Numeric => "numeric",
            RuleId::Present => "present",
            RuleId::Regex => "regex",
            RuleId::Required => "required",
            RuleId::RequiredIf => "required_if",
            RuleId::RequiredUnless => "required_unless",
            RuleId::RequiredWith => "required_with",
            RuleId::RequiredWithAll => "required_with_all",
            RuleId::RequiredWithout => "required_without",
            RuleId::RequiredWithoutAll => "required_without_all",
            RuleId::Same => "same",
            RuleId::Size => "size",
            RuleId::String => "string",
            RuleId::Unique => "unique",
            RuleId::Url => "url",
            RuleId::Uuid => "uuid",
        }
    }

    /// Look up a rule by name
    pub fn from_name(name: &str) -> Option<Self> {
        RuleId::ALL.iter().copied().find(|rule| rule.name() == name)
    }

    /// Implicit rules still run when the field is missing from the input
    pub fn is_implicit(self) -> bool {
        matches!(
            self,
            RuleId::Required
                | RuleId::RequiredIf
                | RuleId::RequiredUnless
                | RuleId::RequiredWith
                | RuleId::RequiredWithAll
                | RuleId::RequiredWithout
                | RuleId::RequiredWithoutAll
                | RuleId::Accepted
                | RuleId::Present
        )
    }

    /// Rules whose message depends on whether the value is a string, number or list
    pub fn is_sizing(self) -> bool {
        matches!(
            self,
            RuleId::Min | RuleId::Max | RuleId::Between | RuleId::Size
        )
    }

    /// Rules that make a numeric string count as a number for sizing
    pub fn marks_numeric(self) -> bool {
        matches!(self, RuleId::Numeric | RuleId::Integer)
    }

    /// Minimum and (optional) maximum parameter count
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            RuleId::After
            | RuleId::Before
            | RuleId::DateFormat
            | RuleId::Different
            | RuleId::Digits
            | RuleId::Max
            | RuleId::Min
            | RuleId::NotRegex
            | RuleId::Regex
            | RuleId::Same
            | RuleId::Size => (1, Some(1)),
            RuleId::Between | RuleId::DigitsBetween => (2, Some(2)),
            RuleId::In
            | RuleId::NotIn
            | RuleId::RequiredWith
            | RuleId::RequiredWithAll
            | RuleId::RequiredWithout
            | RuleId::RequiredWithoutAll => (1, None),
            RuleId::RequiredIf | RuleId::RequiredUnless => (2, None),
            RuleId::Exists => (1, Some(2)),
            RuleId::Unique => (1, Some(4)),
            _ => (0, Some(0)),
        }
    }

    /// Rules whose parameters must all parse as numbers
    fn numeric_params(self) -> bool {
        matches!(
            self,
            RuleId::Min
                | RuleId::Max
                | RuleId::Between
                | RuleId::Size
                | RuleId::Digits
                | RuleId::DigitsBetween
        )
    }

    /// Rules whose single parameter may itself contain commas
    fn takes_raw_parameter(self) -> bool {
        matches!(self, RuleId::Regex | RuleId::NotRegex | RuleId::DateFormat)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One rule applied to one field: a name plus its ordered parameters
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub name: String,
    pub id: Option<RuleId>,
    pub params: Vec<String>,
    /// Compiled pattern for `regex` / `not_regex`
    pub pattern: Option<Regex>,
}

impl PartialEq for RuleSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl RuleSpec {
    /// Parse a single token such as `min:3` or `in:a,b,c`
    pub fn parse(field: &str, token: &str) -> Result<Self, RuleParseError> {
        let token = token.trim();
        let (name, raw_params) = match token.split_once(':') {
            Some((name, rest)) => (name.trim(), Some(rest)),
            None => (token, None),
        };

        if name.is_empty() {
            return Err(RuleParseError::EmptyRule {
                field: field.to_string(),
                rules: token.to_string(),
            });
        }

        let id = RuleId::from_name(name);
        let params = match (raw_params, id) {
            (None, _) => Vec::new(),
            (Some(raw), Some(rule)) if rule.takes_raw_parameter() => vec![raw.to_string()],
            (Some(raw), _) => raw.split(',').map(|p| p.trim().to_string()).collect(),
        };

        let mut spec = RuleSpec {
            name: name.to_string(),
            id,
            params,
            pattern: None,
        };

        if let Some(rule) = id {
            spec.check_parameters(field, rule)?;
            if matches!(rule, RuleId::Regex | RuleId::NotRegex) {
                spec.pattern = Some(compile_pattern(field, rule, &spec.params[0])?);
            }
        }

        Ok(spec)
    }

    /// Whether this spec names a built-in rule
    pub fn is_builtin(&self) -> bool {
        self.id.is_some()
    }

    fn check_parameters(&self, field: &str, rule: RuleId) -> Result<(), RuleParseError> {
        let (min, max) = rule.arity();
        let given = self.params.len();
        let too_few = given < min;
        let too_many = max.is_some_and(|max| given > max);
        if too_few || too_many {
            let expected = match max {
                Some(max) if max == min => format!("{}", min),
                Some(max) => format!("{} to {}", min, max),
                None => format!("at least {}", min),
            };
            return Err(RuleParseError::Arity {
                field: field.to_string(),
                rule: rule.name().to_string(),
                expected,
                given,
            });
        }

        if rule.numeric_params() {
            if let Some(bad) = self.params.iter().find(|p| p.parse::<f64>().is_err()) {
                return Err(RuleParseError::NotNumeric {
                    field: field.to_string(),
                    rule: rule.name().to_string(),
                    value: bad.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Compile a `regex` parameter, accepting `/pattern/flags` delimiters
fn compile_pattern(field: &str, rule: RuleId, raw: &str) -> Result<Regex, RuleParseError> {
    let source = match raw.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
        Some((body, flags)) if flags.chars().all(|c| "imsux".contains(c)) => {
            let flags: String = flags.chars().filter(|c| *c != 'u').collect();
            if flags.is_empty() {
                body.to_string()
            } else {
                format!("(?{}){}", flags, body)
            }
        }
        _ => raw.to_string(),
    };

    Regex::new(&source).map_err(|e| RuleParseError::InvalidPattern {
        field: field.to_string(),
        rule: rule.name().to_string(),
        reason: e.to_string(),
    })
}

/// Ordered rules for a single field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRules {
    pub field: String,
    pub rules: Vec<RuleSpec>,
}

impl FieldRules {
    /// Whether any rule on this field carries the given id
    pub fn has(&self, rule: RuleId) -> bool {
        self.rules.iter().any(|spec| spec.id == Some(rule))
    }
}

/// Field → rules mapping, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    fields: Vec<FieldRules>,
}

impl RuleSet {
    /// Create a new empty rule set
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add `|`-separated rules for a field
    pub fn field(self, field: impl Into<String>, rules: &str) -> Result<Self, RuleParseError> {
        let field = field.into();
        let tokens = split_rule_string(&field, rules)?;
        self.field_rules(field, &tokens)
    }

    /// Add rules for a field in array form; tokens are never split on `|`
    pub fn field_rules<S: AsRef<str>>(
        mut self,
        field: impl Into<String>,
        tokens: &[S],
    ) -> Result<Self, RuleParseError> {
        let field = field.into();
        let specs = tokens
            .iter()
            .map(|token| RuleSpec::parse(&field, token.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        match self.fields.iter_mut().find(|entry| entry.field == field) {
            Some(entry) => entry.rules.extend(specs),
            None => self.fields.push(FieldRules { field, rules: specs }),
        }
        Ok(self)
    }

    /// Build a rule set from `(field, "rule|rule")` pairs
    pub fn parse<'a, I>(pairs: I) -> Result<Self, RuleParseError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        pairs
            .into_iter()
            .try_fold(RuleSet::new(), |set, (field, rules)| set.field(field, rules))
    }

    /// Build a rule set from a JSON object whose values are rule strings or arrays of tokens
    pub fn from_json(value: &Value) -> Result<Self, RuleParseError> {
        let mut set = RuleSet::new();
        let Some(object) = value.as_object() else {
            return Ok(set);
        };

        for (field, rules) in object {
            set = match rules {
                Value::String(rules) => set.field(field.clone(), rules)?,
                Value::Array(tokens) => {
                    let tokens: Vec<&str> = tokens.iter().filter_map(Value::as_str).collect();
                    set.field_rules(field.clone(), &tokens)?
                }
                _ => set,
            };
        }
        Ok(set)
    }

    /// Iterate fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldRules> {
        self.fields.iter()
    }

    /// Rules for a single field
    pub fn get(&self, field: &str) -> Option<&FieldRules> {
        self.fields.iter().find(|entry| entry.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `(field, rule name)` for every rule not in the built-in catalogue
    pub fn unknown_rules(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .flat_map(|entry| {
                entry
                    .rules
                    .iter()
                    .filter(|spec| !spec.is_builtin())
                    .map(move |spec| (entry.field.as_str(), spec.name.as_str()))
            })
            .collect()
    }
}

/// Split a rule string on `|`, keeping `regex:` patterns intact.
///
/// Once a token opens a raw-parameter rule (`regex`, `not_regex`,
/// `date_format`), everything up to the end of the string belongs to it
/// unless the remainder still parses as further rule names. Patterns that
/// contain `|` should use the array form.
fn split_rule_string(field: &str, rules: &str) -> Result<Vec<String>, RuleParseError> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pieces = rules.split('|').peekable();

    while let Some(piece) = pieces.next() {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            if rules.trim().is_empty() {
                break;
            }
            return Err(RuleParseError::EmptyRule {
                field: field.to_string(),
                rules: rules.to_string(),
            });
        }

        let mut token = trimmed.to_string();
        let is_raw = trimmed
            .split_once(':')
            .and_then(|(name, _)| RuleId::from_name(name.trim()))
            .is_some_and(|rule| matches!(rule, RuleId::Regex | RuleId::NotRegex));

        if is_raw {
            while let Some(next) = pieces.peek() {
                if looks_like_rule(next) {
                    break;
                }
                token.push('|');
                token.push_str(next);
                pieces.next();
            }
        }
        tokens.push(token);
    }

    Ok(tokens)
}

fn looks_like_rule(piece: &str) -> bool {
    let name = piece.split(':').next().unwrap_or("").trim();
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_and_parameterised_tokens() {
        let spec = RuleSpec::parse("name", "required").unwrap();
        assert_eq!(spec.id, Some(RuleId::Required));
        assert!(spec.params.is_empty());

        let spec = RuleSpec::parse("role", "in:admin, editor ,author").unwrap();
        assert_eq!(spec.id, Some(RuleId::In));
        assert_eq!(spec.params, vec!["admin", "editor", "author"]);
    }

    #[test]
    fn test_unknown_rule_is_kept_without_id() {
        let spec = RuleSpec::parse("name", "sanitize_title:strict").unwrap();
        assert_eq!(spec.id, None);
        assert_eq!(spec.name, "sanitize_title");
        assert_eq!(spec.params, vec!["strict"]);
    }

    #[test]
    fn test_arity_is_checked_for_known_rules() {
        let err = RuleSpec::parse("name", "min").unwrap_err();
        assert!(matches!(err, RuleParseError::Arity { ref rule, given: 0, .. } if rule == "min"));

        let err = RuleSpec::parse("age", "between:1").unwrap_err();
        assert!(matches!(err, RuleParseError::Arity { .. }));

        let err = RuleSpec::parse("flag", "required_if:other").unwrap_err();
        assert!(matches!(err, RuleParseError::Arity { .. }));
    }

    #[test]
    fn test_numeric_parameters_are_checked() {
        let err = RuleSpec::parse("name", "min:three").unwrap_err();
        assert!(matches!(err, RuleParseError::NotNumeric { ref value, .. } if value == "three"));
    }

    #[test]
    fn test_regex_parameter_is_not_split() {
        let spec = RuleSpec::parse("code", "regex:/^[a-z]{2,4}$/i").unwrap();
        assert_eq!(spec.params, vec!["/^[a-z]{2,4}$/i"]);
        let pattern = spec.pattern.unwrap();
        assert!(pattern.is_match("AbC"));
        assert!(!pattern.is_match("abcde"));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let err = RuleSpec::parse("code", "regex:/([a-z/").unwrap_err();
        assert!(matches!(err, RuleParseError::InvalidPattern { .. }));
    }

    #[test]
    fn test_rule_set_keeps_declaration_order() {
        let rules = RuleSet::new()
            .field("name", "required|min:3")
            .unwrap()
            .field("email", "required|email")
            .unwrap();

        let fields: Vec<&str> = rules.fields().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email"]);

        let names: Vec<&str> = rules
            .get("name")
            .unwrap()
            .rules
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["required", "min"]);
    }

    #[test]
    fn test_repeated_field_extends_rules() {
        let rules = RuleSet::new()
            .field("name", "required")
            .unwrap()
            .field("name", "string")
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.get("name").unwrap().rules.len(), 2);
    }

    #[test]
    fn test_regex_with_pipe_in_rule_string() {
        let rules = RuleSet::new()
            .field("kind", "required|regex:/^(post|page)$/|string")
            .unwrap();
        let specs = &rules.get("kind").unwrap().rules;
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[1].params, vec!["/^(post|page)$/"]);
        assert!(specs[1].pattern.as_ref().unwrap().is_match("page"));
    }

    #[test]
    fn test_empty_rule_segment_is_an_error() {
        let err = RuleSet::new().field("name", "required||min:3").unwrap_err();
        assert!(matches!(err, RuleParseError::EmptyRule { .. }));
    }

    #[test]
    fn test_from_json_accepts_strings_and_arrays() {
        let rules = RuleSet::from_json(&serde_json::json!({
            "title": "required|max:200",
            "slug": ["required", "regex:/^[a-z|-]+$/"],
        }))
        .unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules.get("slug").unwrap().rules[1].params, vec!["/^[a-z|-]+$/"]);
    }

    #[test]
    fn test_unknown_rules_are_reported() {
        let rules = RuleSet::parse([("name", "required|trim"), ("bio", "kses")]).unwrap();
        assert_eq!(rules.unknown_rules(), vec![("name", "trim"), ("bio", "kses")]);
    }

    #[test]
    fn test_every_rule_round_trips_through_its_name() {
        for rule in RuleId::ALL {
            assert_eq!(RuleId::from_name(rule.name()), Some(*rule));
        }
    }
}

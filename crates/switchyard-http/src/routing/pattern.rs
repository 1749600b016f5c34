//! Route pattern compilation
//!
//! Every path pattern compiles to one anchored regex. The forms understood
//! are:
//!
//! - `:id` at the start of a segment, one segment of `[^/]+`
//! - `{id}`, same as `:id`
//! - `{id:int}`, `{id:uuid}`, `{id:alpha}`, `{id:slug}` or `{id:<regex>}`
//! - `(?P<id>regex)`, a raw named group
//!
//! Everything else is literal text and is escaped.

use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur while compiling a route pattern
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutePatternError {
    #[error("Invalid pattern syntax in '{pattern}': {reason}")]
    InvalidSyntax { pattern: String, reason: String },
    #[error("Invalid constraint for '{param}': {reason}")]
    InvalidConstraint { param: String, reason: String },
    #[error("Duplicate parameter name: {0}")]
    DuplicateParameter(String),
}

/// Parameter constraints for validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamConstraint {
    /// No constraint - any non-empty segment
    None,
    /// Must be an unsigned integer
    Int,
    /// Must be a UUID
    Uuid,
    /// Letters only
    Alpha,
    /// Letters, digits, hyphens and underscores
    Slug,
    /// Custom regex source
    Custom(String),
}

impl ParamConstraint {
    /// Parse constraint from its name (e.g. "int", "uuid"); anything else is a regex
    pub fn parse(s: &str) -> Self {
        match s {
            "int" => ParamConstraint::Int,
            "uuid" => ParamConstraint::Uuid,
            "alpha" => ParamConstraint::Alpha,
            "slug" => ParamConstraint::Slug,
            "" => ParamConstraint::None,
            other => ParamConstraint::Custom(other.to_string()),
        }
    }

    /// Regex source for a single occurrence of this parameter
    pub fn regex_source(&self) -> &str {
        match self {
            ParamConstraint::None => "[^/]+",
            ParamConstraint::Int => r"\d+",
            ParamConstraint::Uuid => {
                "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
            }
            ParamConstraint::Alpha => r"\p{Alphabetic}+",
            ParamConstraint::Slug => r"[\p{Alphabetic}\p{Nd}_-]+",
            ParamConstraint::Custom(source) => source,
        }
    }
}

/// A piece of a compiled pattern, kept for URL generation
#[derive(Debug, Clone)]
enum Piece {
    Literal(String),
    Param { name: String, matcher: Regex },
}

/// Compiled route pattern
#[derive(Debug, Clone)]
pub struct RoutePattern {
    /// Normalized source pattern
    pub path: String,
    /// Parameter names in order of appearance
    pub param_names: Vec<String>,
    regex: Regex,
    pieces: Vec<Piece>,
}

impl PartialEq for RoutePattern {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl RoutePattern {
    /// Compile a pattern string into an anchored regex
    pub fn parse(pattern: &str) -> Result<Self, RoutePatternError> {
        let path = normalize_path(pattern);
        let mut parser = Parser::new(&path);
        parser.run()?;
        let Parser {
            regex: body,
            names,
            pieces,
            ..
        } = parser;

        let regex = Regex::new(&format!("^{}$", body)).map_err(|e| {
            RoutePatternError::InvalidSyntax {
                pattern: path.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(RoutePattern {
            path,
            param_names: names,
            regex,
            pieces,
        })
    }

    /// The compiled regex source, anchored
    pub fn as_regex(&self) -> &str {
        self.regex.as_str()
    }

    /// Match a normalized request path, returning the named parameters
    /// percent-decoded
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.param_names
                .iter()
                .filter_map(|name| caps.name(name).map(|m| (name.clone(), decode_segment(m.as_str()))))
                .collect(),
        )
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Fill the pattern with `params`, percent-encoding each value.
    ///
    /// Parameters the pattern does not use are appended as a query string in
    /// key order.
    pub fn build(&self, params: &HashMap<String, String>) -> Result<String, UrlBuildError> {
        let mut url = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => url.push_str(text),
                Piece::Param { name, matcher } => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| UrlBuildError::MissingParameter(name.clone()))?;
                    if !matcher.is_match(value) {
                        return Err(UrlBuildError::InvalidParameter {
                            param: name.clone(),
                            value: value.clone(),
                        });
                    }
                    url.push_str(&urlencoding::encode(value));
                }
            }
        }

        let extra: BTreeMap<&str, &str> = params
            .iter()
            .filter(|(key, _)| !self.param_names.iter().any(|name| name == *key))
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        if !extra.is_empty() {
            let query = serde_urlencoded::to_string(&extra)
                .map_err(|e| UrlBuildError::Query(e.to_string()))?;
            url.push('?');
            url.push_str(&query);
        }

        Ok(url)
    }
}

/// Percent-decode a captured segment, keeping the raw text when it is not UTF-8
fn decode_segment(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Reasons a pattern could not be filled
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlBuildError {
    #[error("missing parameter '{0}'")]
    MissingParameter(String),
    #[error("value '{value}' does not satisfy parameter '{param}'")]
    InvalidParameter { param: String, value: String },
    #[error("cannot encode query string: {0}")]
    Query(String),
}

/// Leading `/` added, trailing `/` removed (except root), repeated `/` collapsed
pub fn normalize_path(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", joined)
}

/// Single-pass scanner turning a normalized pattern into regex source
struct Parser<'p> {
    pattern: &'p str,
    regex: String,
    literal: String,
    names: Vec<String>,
    seen: HashSet<String>,
    pieces: Vec<Piece>,
}

impl<'p> Parser<'p> {
    fn new(pattern: &'p str) -> Self {
        Self {
            pattern,
            regex: String::new(),
            literal: String::new(),
            names: Vec::new(),
            seen: HashSet::new(),
            pieces: Vec::new(),
        }
    }

    fn run(&mut self) -> Result<(), RoutePatternError> {
        let pattern = self.pattern;
        let bytes = pattern.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            let rest = &pattern[i..];
            let segment_start = i == 0 || bytes[i - 1] == b'/';

            if segment_start && rest.starts_with(':') {
                let name: String = rest[1..]
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                if name.is_empty() {
                    return Err(self.syntax("':' must be followed by a parameter name"));
                }
                i += 1 + name.len();
                self.param(name, ParamConstraint::None.regex_source())?;
            } else if rest.starts_with("(?P<") {
                let close = self.closing(i, b'(', b')')?;
                let inner = &pattern[i + 4..close];
                let (name, body) = inner
                    .split_once('>')
                    .ok_or_else(|| self.syntax("unterminated named group"))?;
                i = close + 1;
                self.param(name.to_string(), body)?;
            } else if rest.starts_with('{') {
                let close = self.closing(i, b'{', b'}')?;
                let inner = &pattern[i + 1..close];
                let (name, constraint) = match inner.split_once(':') {
                    Some((name, constraint)) => (name.trim(), ParamConstraint::parse(constraint.trim())),
                    None => (inner.trim(), ParamConstraint::None),
                };
                let name = name.to_string();
                i = close + 1;
                self.param(name, constraint.regex_source())?;
            } else {
                let c = rest.chars().next().unwrap_or('/');
                self.literal.push(c);
                i += c.len_utf8();
            }
        }

        self.flush_literal();
        Ok(())
    }

    /// Byte index of the bracket closing the one at `open_at`
    fn closing(&self, open_at: usize, open: u8, close: u8) -> Result<usize, RoutePatternError> {
        let bytes = self.pattern.as_bytes();
        let mut depth = 0usize;
        let mut escaped = false;
        let mut in_class = false;
        for (offset, byte) in bytes[open_at..].iter().enumerate() {
            if escaped {
                escaped = false;
                continue;
            }
            // Brackets inside a character class are literal
            if in_class {
                match *byte {
                    b'\\' => escaped = true,
                    b']' => in_class = false,
                    _ => {}
                }
                continue;
            }
            match *byte {
                b'\\' => escaped = true,
                b'[' if depth > 0 => in_class = true,
                b if b == open => depth += 1,
                b if b == close => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(open_at + offset);
                    }
                }
                _ => {}
            }
        }
        Err(self.syntax(&format!("unbalanced '{}'", open as char)))
    }

    fn param(&mut self, name: String, source: &str) -> Result<(), RoutePatternError> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(self.syntax(&format!("invalid parameter name '{}'", name)));
        }
        if !self.seen.insert(name.clone()) {
            return Err(RoutePatternError::DuplicateParameter(name));
        }

        let matcher = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            RoutePatternError::InvalidConstraint {
                param: name.clone(),
                reason: e.to_string(),
            }
        })?;

        self.flush_literal();
        self.regex.push_str(&format!("(?P<{}>{})", name, source));
        self.pieces.push(Piece::Param {
            name: name.clone(),
            matcher,
        });
        self.names.push(name);
        Ok(())
    }

    fn flush_literal(&mut self) {
        if self.literal.is_empty() {
            return;
        }
        self.regex.push_str(&regex::escape(&self.literal));
        self.pieces.push(Piece::Literal(std::mem::take(&mut self.literal)));
    }

    fn syntax(&self, reason: &str) -> RoutePatternError {
        RoutePatternError::InvalidSyntax {
            pattern: self.pattern.to_string(),
            reason: reason.to_string(),
        }
    }
}

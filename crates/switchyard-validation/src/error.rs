//! Validation error types and handling

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub type ValidationResult<T> = Result<T, ValidationErrors>;

/// Individual validation error for a specific field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    /// The field (dot-path) that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Name of the rule that produced the error
    pub code: String,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: "validation_failed".to_string(),
        }
    }

    /// Create a validation error with a specific code
    pub fn with_code(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Collection of validation errors keyed by field.
///
/// Fields are kept in a `BTreeMap` so that two runs over the same input
/// render identically; messages within a field keep rule declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Map of field names to their validation errors
    pub errors: BTreeMap<String, Vec<ValidationError>>,
}

impl ValidationErrors {
    /// Create a new empty validation errors collection
    pub fn new() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }

    /// Add a single validation error
    pub fn add(&mut self, error: ValidationError) {
        self.errors
            .entry(error.field.clone())
            .or_default()
            .push(error);
    }

    /// Add a simple validation error with field and message
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.add(ValidationError::new(field, message));
    }

    /// Check if there are any validation errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of fields with errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Get total number of validation errors across all fields
    pub fn total_errors(&self) -> usize {
        self.errors.values().map(|v| v.len()).sum()
    }

    /// Get errors for a specific field
    pub fn get_field_errors(&self, field: &str) -> Option<&Vec<ValidationError>> {
        self.errors.get(field)
    }

    /// Messages recorded for a field, in rule order
    pub fn messages(&self, field: &str) -> Vec<&str> {
        self.errors
            .get(field)
            .map(|errors| errors.iter().map(|e| e.message.as_str()).collect())
            .unwrap_or_default()
    }

    /// Check if a specific field has errors
    pub fn has_field_errors(&self, field: &str) -> bool {
        self.errors.get(field).is_some_and(|e| !e.is_empty())
    }

    /// Merge another ValidationErrors into this one
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, errors) in other.errors {
            self.errors.entry(field).or_default().extend(errors);
        }
    }

    /// Create ValidationErrors from a single error
    pub fn from_error(error: ValidationError) -> Self {
        let mut errors = Self::new();
        errors.add(error);
        errors
    }

    /// Field → messages view used by response envelopes
    pub fn to_messages(&self) -> BTreeMap<String, Vec<String>> {
        self.errors
            .iter()
            .map(|(field, errors)| {
                (
                    field.clone(),
                    errors.iter().map(|e| e.message.clone()).collect(),
                )
            })
            .collect()
    }

    /// Convert to a JSON-serializable format for API responses
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": "validation_failed",
                "message": "Validation failed",
                "fields": self.to_messages()
            }
        })
    }
}

impl Default for ValidationErrors {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "No validation errors")
        } else {
            write!(f, "Validation failed for {} field(s):", self.errors.len())?;
            for (field, field_errors) in &self.errors {
                for error in field_errors {
                    write!(f, "\n  {}: {}", field, error.message)?;
                }
            }
            Ok(())
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self::from_error(error)
    }
}

/// Errors raised while parsing rule strings into a `RuleSet`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("Empty rule in '{rules}' for field '{field}'")]
    EmptyRule { field: String, rules: String },

    #[error("Rule '{rule}' on field '{field}' expects {expected}, got {given} parameter(s)")]
    Arity {
        field: String,
        rule: String,
        expected: String,
        given: usize,
    },

    #[error("Rule '{rule}' on field '{field}' has a non-numeric parameter '{value}'")]
    NotNumeric {
        field: String,
        rule: String,
        value: String,
    },

    #[error("Rule '{rule}' on field '{field}' has an invalid pattern: {reason}")]
    InvalidPattern {
        field: String,
        rule: String,
        reason: String,
    },

    #[error("Unknown rule '{rule}' on field '{field}'")]
    UnknownRule { field: String, rule: String },
}

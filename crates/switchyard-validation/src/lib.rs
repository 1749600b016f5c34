//! # switchyard-validation
//!
//! Rule-string validation for the switchyard routing layer.
//!
//! Rules are written as `"required|min:3|email"` per field, parsed once into a
//! [`RuleSet`], and evaluated through a closed table of rule functions. Input
//! is `serde_json::Value`; nested fields are addressed with dot-paths.
//!
//! ```ignore
//! use switchyard_validation::{RuleSet, Validator};
//!
//! let rules = RuleSet::new().field("email", "required|email")?;
//! let data = serde_json::json!({"email": "ada@example.com"});
//! Validator::new().validate(&data, &rules)?;
//! ```

pub mod engine;
pub mod error;
pub mod messages;
pub mod path;
pub mod rules;
pub mod traits;
pub mod validator;
pub mod validators;

pub use engine::{RuleContext, RuleEngine, RuleFn};
pub use error::{RuleParseError, ValidationError, ValidationErrors, ValidationResult};
pub use messages::{Attributes, Messages};
pub use rules::{FieldRules, RuleId, RuleSet, RuleSpec};
pub use traits::StoreQuery;
pub use validator::{CustomRule, Validator, ValidatorConfig};

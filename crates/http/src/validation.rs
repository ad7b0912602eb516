//! Declarative field validation for request forms.
//!
//! A form implements [`Validatable`] by listing its fields and the rules each
//! must satisfy:
//!
//! ```ignore
//! impl Validatable for BookForm {
//!     fn validate(&self) -> Result<(), Vec<FieldError>> {
//!         Validation::new()
//!             .field("title", &self.title, &[Rule::Required, Rule::MaxLength(255)])
//!             .finish()
//!     }
//! }
//! ```
//!
//! Rules on one field stop at the first failure, so a field contributes at
//! most one [`FieldError`].

use std::fmt;

/// A single rule applied to a string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Value must not be empty
    Required,
    /// Value must not exceed this many characters
    MaxLength(usize),
}

impl Rule {
    fn check(self, value: &str) -> bool {
        match self {
            Rule::Required => !value.is_empty(),
            Rule::MaxLength(max) => value.chars().count() <= max,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required => write!(f, "required"),
            Rule::MaxLength(max) => write!(f, "max={}", max),
        }
    }
}

/// A rule violation on a named field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub rule: Rule,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, rule: Rule) -> Self {
        let message = match rule {
            Rule::Required => format!("{} is a required field", field),
            Rule::MaxLength(max) => format!("{} must be a maximum of {} in length", field, max),
        };
        Self {
            field,
            rule,
            message,
        }
    }
}

/// Types whose contents can be checked before use.
pub trait Validatable {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// Accumulates violations across fields.
#[derive(Debug, Default)]
pub struct Validation {
    errors: Vec<FieldError>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `rules` to `value` in order, recording the first one that fails.
    pub fn field(mut self, name: &'static str, value: &str, rules: &[Rule]) -> Self {
        if let Some(rule) = rules.iter().copied().find(|rule| !rule.check(value)) {
            self.errors.push(FieldError::new(name, rule));
        }
        self
    }

    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

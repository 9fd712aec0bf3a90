//! Value validation
//!
//! Schema issues and a small rules builder for hand-written validators.
//! [`TypedSchema`](crate::schema::TypedSchema) runs [`Validate`] after
//! deserializing a value, so input types usually only need to implement it.
//!
//! # Example
//!
//! ```rust,ignore
//! use orpc::validation::{Validate, ValidationResult, ValidationRules};
//!
//! #[derive(Debug, serde::Deserialize, serde::Serialize)]
//! struct CreatePlanet {
//!     name: String,
//!     description: Option<String>,
//! }
//!
//! impl Validate for CreatePlanet {
//!     fn validate(&self) -> ValidationResult {
//!         ValidationRules::new()
//!             .required("name", &self.name)
//!             .max_length("name", &self.name, 64)
//!             .build()
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace, warn};

/// A single problem reported by a schema.
///
/// `path` locates the offending value inside the validated document
/// (empty for the root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Location of the offending value
    #[serde(default)]
    pub path: Vec<String>,
    /// Human-readable message
    pub message: String,
    /// Machine-readable kind of failure
    pub code: String,
}

impl Issue {
    /// Create a new issue.
    pub fn new(
        path: impl IntoIterator<Item = impl Into<String>>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            message: message.into(),
            code: code.into(),
        }
    }

    /// Create an issue for the root value.
    pub fn root(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
            code: code.into(),
        }
    }

    /// Create a "required" issue for a top-level field
    pub fn required(field: &str) -> Self {
        Self::new([field], format!("{} is required", field), "required")
    }

    /// Create a "min_length" issue
    pub fn min_length(field: &str, min: usize) -> Self {
        Self::new(
            [field],
            format!("{} must be at least {} characters", field, min),
            "min_length",
        )
    }

    /// Create a "max_length" issue
    pub fn max_length(field: &str, max: usize) -> Self {
        Self::new(
            [field],
            format!("{} must be at most {} characters", field, max),
            "max_length",
        )
    }

    /// Create a "range" issue
    pub fn range(field: &str, min: impl fmt::Display, max: impl fmt::Display) -> Self {
        Self::new(
            [field],
            format!("{} must be between {} and {}", field, min, max),
            "range",
        )
    }

    /// Create a "pattern" issue
    pub fn pattern(field: &str, pattern: &str) -> Self {
        Self::new(
            [field],
            format!("{} must match pattern: {}", field, pattern),
            "pattern",
        )
    }

    /// Create an "email" issue
    pub fn email(field: &str) -> Self {
        Self::new(
            [field],
            format!("{} must be a valid email address", field),
            "email",
        )
    }

    /// Create a custom issue
    pub fn custom(field: &str, message: impl Into<String>) -> Self {
        Self::new([field], message, "custom")
    }

    /// Prefix the issue path with `segment`.
    pub fn nested(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }

    /// The path joined with dots, e.g. `body.name`.
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.dotted_path(), self.message)
        }
    }
}

/// Result of validating a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the value is valid
    pub valid: bool,
    /// Issues found (empty if valid)
    pub issues: Vec<Issue>,
}

impl ValidationResult {
    /// Create a successful validation result
    pub fn ok() -> Self {
        Self {
            valid: true,
            issues: Vec::new(),
        }
    }

    /// Create a validation result from a list of issues.
    /// If the list is empty, the result is valid.
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        if !issues.is_empty() {
            let paths: Vec<_> = issues.iter().map(Issue::dotted_path).collect();
            debug!(issue_count = issues.len(), paths = ?paths, "Validation failed");
        }
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Get the issues
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Group issues by their dotted path
    pub fn issues_by_path(&self) -> HashMap<String, Vec<&Issue>> {
        let mut map: HashMap<String, Vec<&Issue>> = HashMap::new();
        for issue in &self.issues {
            map.entry(issue.dotted_path()).or_default().push(issue);
        }
        map
    }

    /// Merge another validation result into this one
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.issues.extend(other.issues);
        self.valid = self.issues.is_empty();
        self
    }

    /// Convert into a `Result`, handing back the issues on failure.
    pub fn into_result(self) -> Result<(), Vec<Issue>> {
        if self.valid { Ok(()) } else { Err(self.issues) }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// Trait for types that check their own invariants after deserialization.
pub trait Validate {
    /// Validate the value and return a result with any issues
    fn validate(&self) -> ValidationResult;
}

impl Validate for () {
    fn validate(&self) -> ValidationResult {
        ValidationResult::ok()
    }
}

impl Validate for serde_json::Value {
    fn validate(&self) -> ValidationResult {
        ValidationResult::ok()
    }
}

impl Validate for String {
    fn validate(&self) -> ValidationResult {
        ValidationResult::ok()
    }
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> ValidationResult {
        match self {
            Some(value) => value.validate(),
            None => ValidationResult::ok(),
        }
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> ValidationResult {
        let issues = self
            .iter()
            .enumerate()
            .flat_map(|(i, item)| {
                item.validate()
                    .issues
                    .into_iter()
                    .map(move |issue| issue.nested(i.to_string()))
            })
            .collect();
        ValidationResult::from_issues(issues)
    }
}

/// Fluent builder for common validation rules.
///
/// ```rust,ignore
/// let result = ValidationRules::new()
///     .required("email", &input.email)
///     .email("email", &input.email)
///     .min_length("password", &input.password, 8)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ValidationRules {
    issues: Vec<Issue>,
}

impl ValidationRules {
    /// Create a new validation rules builder
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Add an issue directly
    pub fn add_issue(mut self, issue: Issue) -> Self {
        trace!(path = %issue.dotted_path(), code = %issue.code, "Adding validation issue");
        self.issues.push(issue);
        self
    }

    /// Validate that a string field is not blank
    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            trace!(field = %field, "Required field is empty");
            self.issues.push(Issue::required(field));
        }
        self
    }

    /// Validate minimum string length (in characters)
    pub fn min_length(mut self, field: &str, value: &str, min: usize) -> Self {
        let length = value.chars().count();
        if length < min {
            trace!(field = %field, length, min, "Field below minimum length");
            self.issues.push(Issue::min_length(field, min));
        }
        self
    }

    /// Validate maximum string length (in characters)
    pub fn max_length(mut self, field: &str, value: &str, max: usize) -> Self {
        let length = value.chars().count();
        if length > max {
            trace!(field = %field, length, max, "Field exceeds maximum length");
            self.issues.push(Issue::max_length(field, max));
        }
        self
    }

    /// Validate that a number is within a range (inclusive)
    pub fn range(mut self, field: &str, value: i64, min: i64, max: i64) -> Self {
        if value < min || value > max {
            trace!(field = %field, value, min, max, "Field outside valid range");
            self.issues.push(Issue::range(field, min, max));
        }
        self
    }

    /// Validate that a string matches a regex pattern
    pub fn pattern(mut self, field: &str, value: &str, pattern: &str) -> Self {
        match regex::Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(value) {
                    trace!(field = %field, pattern = %pattern, "Field does not match pattern");
                    self.issues.push(Issue::pattern(field, pattern));
                }
            }
            Err(e) => {
                warn!(field = %field, pattern = %pattern, error = %e, "Invalid validation regex pattern");
                self.issues.push(Issue::new(
                    [field],
                    format!("Invalid validation pattern: {}", pattern),
                    "invalid_pattern",
                ));
            }
        }
        self
    }

    /// Validate that a string looks like an email address
    pub fn email(mut self, field: &str, value: &str) -> Self {
        let is_valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };

        if !is_valid {
            trace!(field = %field, "Invalid email format");
            self.issues.push(Issue::email(field));
        }
        self
    }

    /// Add a custom validation with a predicate
    pub fn custom<F>(mut self, field: &str, predicate: F, message: &str) -> Self
    where
        F: FnOnce() -> bool,
    {
        if !predicate() {
            trace!(field = %field, message = %message, "Custom validation failed");
            self.issues.push(Issue::custom(field, message));
        }
        self
    }

    /// Build the validation result
    pub fn build(self) -> ValidationResult {
        ValidationResult::from_issues(self.issues)
    }
}

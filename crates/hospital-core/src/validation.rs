//! Field-level input validation
//!
//! Every record is validated before it is persisted. Failures are reported
//! per field so callers can point the operator at the offending input;
//! nothing is coerced into a valid shape.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Phone numbers: optional `+`, optional country code `1`, then 9-15 digits.
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?1?\d{9,15}$").expect("phone pattern is a valid regex"));

pub const PHONE_FORMAT_MESSAGE: &str =
    "Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.";

/// Validation error with detailed context
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: ValidationErrorCode,
}

/// Specific validation error codes for programmatic handling
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValidationErrorCode {
    Required,
    InvalidFormat,
    OutOfRange,
    TooLong,
    InvalidChoice,
    DuplicateValue,
    InvalidReference,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({:?})", self.field, self.message, self.code)
    }
}

/// Non-empty set of validation failures, returned when a write is rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", join_errors(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn single(field: &str, message: &str, code: ValidationErrorCode) -> Self {
        let mut result = ValidationResult::new();
        result.add_error(field, message, code);
        Self { errors: result.errors }
    }

    pub fn has_code(&self, field: &str, code: ValidationErrorCode) -> bool {
        self.errors.iter().any(|e| e.field == field && e.code == code)
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validation result that can accumulate multiple errors
#[derive(Clone, Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add_error(&mut self, field: &str, message: &str, code: ValidationErrorCode) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
            code,
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValidationErrors { errors: self.errors })
        }
    }

    /// Human-readable summary, used by the integrity zome's `Invalid(..)` result.
    pub fn summary(&self) -> String {
        join_errors(&self.errors)
    }
}

/// Required text field with an upper length bound (in characters).
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> ValidationResult {
    let mut result = ValidationResult::new();

    if value.trim().is_empty() {
        result.add_error(field, "This field is required", ValidationErrorCode::Required);
        return result;
    }

    result.merge(validate_max_len(value, field, max_len));
    result
}

pub fn validate_max_len(value: &str, field: &str, max_len: usize) -> ValidationResult {
    let mut result = ValidationResult::new();
    let len = value.chars().count();

    if len > max_len {
        result.add_error(
            field,
            &format!("Ensure this value has at most {} characters (it has {})", max_len, len),
            ValidationErrorCode::TooLong,
        );
    }

    result
}

/// Validate a phone number against [`PHONE_PATTERN`].
pub fn validate_phone(phone: &str, field: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if phone.is_empty() {
        result.add_error(field, "Phone number is required", ValidationErrorCode::Required);
        return result;
    }

    result.merge(validate_max_len(phone, field, 20));

    if !PHONE_PATTERN.is_match(phone) {
        result.add_error(field, PHONE_FORMAT_MESSAGE, ValidationErrorCode::InvalidFormat);
    }

    result
}

/// Like [`validate_phone`] but blank is allowed.
pub fn validate_optional_phone(phone: Option<&str>, field: &str) -> ValidationResult {
    match phone {
        Some(p) if !p.is_empty() => validate_phone(p, field),
        _ => ValidationResult::new(),
    }
}

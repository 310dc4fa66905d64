//! Validation error types
//!
//! Everything a caller can get wrong before the store is touched ends up here:
//! unknown attribute names, values of the wrong kind, out-of-range pagination
//! and field rules on records.

use std::fmt;

use crate::value::FieldKind;

/// Validation error for caller input and records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is not an attribute (or relation) of the entity
    UnknownAttribute { context: &'static str, name: String },

    /// Declared search field is not a text attribute of the entity
    SearchField { name: String },

    /// Value cannot be coerced into the attribute's kind
    InvalidValue { field: String, expected: FieldKind },

    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// Number outside the accepted range
    OutOfRange { field: &'static str, min: i64, max: i64 },

    /// Attribute cannot be changed after creation
    Immutable { field: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAttribute { context, name } => {
                write!(f, "invalid {} attribute: {}", context, name)
            }
            Self::SearchField { name } => write!(f, "invalid search field: {}", name),
            Self::InvalidValue { field, expected } => {
                write!(f, "invalid value for {}: expected {}", field, expected)
            }
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::OutOfRange { field, min, max } => {
                write!(f, "{} must be between {} and {}", field, min, max)
            }
            Self::Immutable { field } => write!(f, "{} cannot be changed", field),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// Name of the offending field or attribute.
    pub fn field(&self) -> &str {
        match self {
            Self::UnknownAttribute { name, .. } | Self::SearchField { name } => name,
            Self::InvalidValue { field, .. } | Self::Immutable { field } => field,
            Self::Empty { field } | Self::TooLong { field, .. } | Self::OutOfRange { field, .. } => {
                field
            }
        }
    }
}

/// Require non-empty text of at most `max` characters.
pub fn text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    required(field, value)?;
    max_length(field, value, max)
}

/// Require non-blank text.
pub fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

/// Require at most `max` characters.
pub fn max_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Require `min <= value <= max`.
pub fn range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, min, max });
    }
    Ok(())
}

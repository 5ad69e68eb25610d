//! Validation trait and range helpers for configuration types

use crate::error::{ConfigError, Result};

/// Trait for validating configuration values
///
/// Implementations check invariants that the type system cannot express and return the
/// first violation found. Callers that need every violation (the schema validator) call
/// the helpers below field by field instead.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Helper function to validate value is within range
pub fn validate_range(field: impl Into<String>, value: f64, min: f64, max: f64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field: field.into(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Helper function to validate integer is above minimum
pub fn validate_positive(field: impl Into<String>, value: u64, min: u64) -> Result<()> {
    if value <= min {
        return Err(ConfigError::InvalidInteger {
            field: field.into(),
            value,
            min,
        });
    }
    Ok(())
}

/// Helper function to validate a string is present
pub fn validate_non_empty(field: impl Into<String>, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: field.into(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

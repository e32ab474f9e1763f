// =====================================================================================
// File: core-model/src/error.rs
// Description: Error types for the canonical model
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use thiserror::Error;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Canonical model error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A string could not be resolved to any variant of a closed enumeration
    #[error("Unknown {enum_name} value: '{value}'")]
    UnknownEnumValue { enum_name: &'static str, value: String },

    /// A numeric field fell outside its contractual range
    #[error("Value out of range for {field}: {value} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Two fields that must agree do not
    #[error("Inconsistent record: {message}")]
    Inconsistent { message: String },

    /// A required field is missing or empty
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
}

impl ModelError {
    pub fn unknown_enum(enum_name: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownEnumValue {
            enum_name,
            value: value.into(),
        }
    }

    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }
}

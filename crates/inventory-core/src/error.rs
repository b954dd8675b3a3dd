//! # Error Types
//!
//! Domain-specific error types for inventory-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  inventory-core errors (this file)                                      │
//! │  ├── CoreError        - Ledger arithmetic and rule failures             │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  inventory-db errors (separate crate)                                   │
//! │  ├── DbError          - Storage and transaction failures                │
//! │  └── BridgeError      - What the renderer sees (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → BridgeError              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core ledger errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A monetary computation left the `i64` range.
    ///
    /// ## When This Occurs
    /// - `unit price × quantity` overflows on an absurd input
    /// - Summing a document whose lines are already near the limit
    #[error("Amount overflow while computing {context}")]
    AmountOverflow { context: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an overflow error for the given computation.
    pub fn overflow(context: impl Into<String>) -> Self {
        CoreError::AmountOverflow {
            context: context.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any transaction is opened.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., bad email, unknown currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A collection that needs at least one element is empty.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },

    /// Value exceeds an amount derived from other data.
    ///
    /// ## Examples
    /// - discount larger than the document total
    /// - returning more units than were sold
    #[error("{field} ({value}) exceeds the allowed maximum of {max}")]
    ExceedsLimit { field: String, value: i64, max: i64 },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("first_name");
        assert_eq!(err.to_string(), "first_name is required");

        let err = ValidationError::ExceedsLimit {
            field: "discount".to_string(),
            value: 500,
            max: 300,
        };
        assert_eq!(
            err.to_string(),
            "discount (500) exceeds the allowed maximum of 300"
        );
    }

    #[test]
    fn test_overflow_message() {
        let err = CoreError::overflow("line total");
        assert_eq!(err.to_string(), "Amount overflow while computing line total");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Empty {
            field: "lines".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

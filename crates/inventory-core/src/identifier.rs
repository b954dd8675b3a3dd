//! # Business Identifiers
//!
//! Formatting of the human-readable numbers printed on receipts and
//! customer cards. The counter values themselves come from the database
//! sequences in `inventory-db`; this module only turns a counter into text
//! and back.
//!
//! | Kind     | Prefix | Width | First value       |
//! |----------|--------|-------|-------------------|
//! | Customer | `CUS`  | 6     | `CUS000001`       |
//! | Invoice  | `INV`  | 10    | `INV0000000001`   |
//!
//! Values wider than the width are printed in full, never truncated.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Prefix + zero-padded counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierFormat {
    pub prefix: String,
    pub width: usize,
}

impl IdentifierFormat {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        IdentifierFormat {
            prefix: prefix.into(),
            width,
        }
    }

    /// Customer numbers: `CUS000001`.
    pub fn customer() -> Self {
        IdentifierFormat::new("CUS", 6)
    }

    /// Invoice numbers: `INV0000000001`.
    pub fn invoice() -> Self {
        IdentifierFormat::new("INV", 10)
    }

    /// Formats a counter value.
    ///
    /// ## Example
    /// ```rust
    /// use inventory_core::identifier::IdentifierFormat;
    ///
    /// assert_eq!(IdentifierFormat::customer().format(42), "CUS000042");
    /// assert_eq!(IdentifierFormat::invoice().format(7), "INV0000000007");
    /// ```
    pub fn format(&self, value: i64) -> String {
        format!("{}{:0width$}", self.prefix, value, width = self.width)
    }

    /// Extracts the counter value from a formatted identifier.
    ///
    /// Returns `None` when the prefix doesn't match or the rest isn't a number.
    pub fn parse(&self, identifier: &str) -> Option<i64> {
        identifier
            .strip_prefix(self.prefix.as_str())
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
    }

    /// Rejects formats that could not produce a readable identifier.
    pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
        if self.prefix.trim().is_empty() {
            return Err(ValidationError::required(format!("{}.prefix", field)));
        }
        if self.prefix.bytes().any(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidFormat {
                field: format!("{}.prefix", field),
                reason: "must not contain digits".to_string(),
            });
        }
        if !(1..=18).contains(&self.width) {
            return Err(ValidationError::OutOfRange {
                field: format!("{}.width", field),
                min: 1,
                max: 18,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(IdentifierFormat::customer().format(1), "CUS000001");
        assert_eq!(IdentifierFormat::invoice().format(1), "INV0000000001");
    }

    #[test]
    fn test_overflowing_width_is_not_truncated() {
        assert_eq!(IdentifierFormat::customer().format(1_234_567), "CUS1234567");
    }

    #[test]
    fn test_parse() {
        let fmt = IdentifierFormat::customer();
        assert_eq!(fmt.parse("CUS000042"), Some(42));
        assert_eq!(fmt.parse("INV000042"), None);
        assert_eq!(fmt.parse("CUS"), None);
        assert_eq!(fmt.parse("CUS12a"), None);
    }

    #[test]
    fn test_validate() {
        assert!(IdentifierFormat::invoice().validate("invoice").is_ok());
        assert!(IdentifierFormat::new("", 6).validate("customer").is_err());
        assert!(IdentifierFormat::new("C1", 6).validate("customer").is_err());
        assert!(IdentifierFormat::new("CUS", 0).validate("customer").is_err());
    }
}

//! # Validation Module
//!
//! Input validation for everything a caller can hand to the ledger.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Renderer forms                                                │
//! │  └── Immediate user feedback                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Runs before a transaction is opened; nothing is written on failure │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  ├── UNIQUE constraints (barcode, email, business numbers)              │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{NewCustomer, NewProduct, NewSupplier, NewUser, UserUpdate};
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_NAME_LEN: usize = 200;
const MAX_ACCESSORY_LEN: usize = 100;
const MAX_ACCESSORIES: usize = 50;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a mandatory display name (product, supplier, person).
///
/// ## Example
/// ```rust
/// use inventory_core::validation::validate_name;
///
/// assert!(validate_name("name", "Galaxy A15").is_ok());
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an optional free-text field against a length limit.
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates an email address (shape only).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected name@domain".to_string(),
        });
    }

    Ok(())
}

/// Validates a search term and returns it trimmed.
///
/// An empty term is allowed; repositories treat it as "match everything".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a document line quantity: positive and at most
/// [`MAX_LINE_QUANTITY`].
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock adjustment amount. Zero is a no-op, negative is rejected.
pub fn validate_stock_delta(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a record id reference.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Clamps a caller-supplied row limit into `1..=1000`.
pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, 1000)
}

// =============================================================================
// Record Validators
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_name("name", &product.name)?;
    validate_optional_text("brand", product.brand.as_deref(), MAX_NAME_LEN)?;
    validate_optional_text("model", product.model.as_deref(), MAX_NAME_LEN)?;
    validate_optional_text("category", product.category.as_deref(), MAX_NAME_LEN)?;
    validate_optional_text("barcode", product.barcode.as_deref(), 64)?;

    if product.stock_quantity < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock_quantity".to_string(),
        });
    }
    if product.min_stock_alert < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "min_stock_alert".to_string(),
        });
    }

    product.cost_price.ensure_non_negative("cost_price")?;
    product.selling_price_afg.ensure_non_negative("selling_price_afg")?;
    product.selling_price_usd.ensure_non_negative("selling_price_usd")?;

    if product.accessories.len() > MAX_ACCESSORIES {
        return Err(ValidationError::OutOfRange {
            field: "accessories".to_string(),
            min: 0,
            max: MAX_ACCESSORIES as i64,
        });
    }
    for accessory in &product.accessories {
        validate_name("accessory", accessory)?;
        validate_optional_text("accessory", Some(accessory), MAX_ACCESSORY_LEN)?;
    }

    Ok(())
}

pub fn validate_new_customer(customer: &NewCustomer) -> ValidationResult<()> {
    validate_name("first_name", &customer.first_name)?;
    validate_optional_text("last_name", customer.last_name.as_deref(), MAX_NAME_LEN)?;
    validate_optional_text("phone", customer.phone.as_deref(), 32)?;
    Ok(())
}

pub fn validate_new_supplier(supplier: &NewSupplier) -> ValidationResult<()> {
    validate_name("name", &supplier.name)?;
    validate_optional_text("company_name", supplier.company_name.as_deref(), MAX_NAME_LEN)?;
    validate_optional_text("company_phone", supplier.company_phone.as_deref(), 32)?;
    if let Some(email) = supplier.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    validate_optional_text("address", supplier.address.as_deref(), 500)?;
    Ok(())
}

pub fn validate_new_user(user: &NewUser) -> ValidationResult<()> {
    validate_name("first_name", &user.first_name)?;
    validate_optional_text("last_name", user.last_name.as_deref(), MAX_NAME_LEN)?;
    validate_email(&user.email)?;
    if user.password_hash.is_empty() {
        return Err(ValidationError::required("password_hash"));
    }
    Ok(())
}

pub fn validate_user_update(user: &UserUpdate) -> ValidationResult<()> {
    validate_name("first_name", &user.first_name)?;
    validate_optional_text("last_name", user.last_name.as_deref(), MAX_NAME_LEN)?;
    validate_email(&user.email)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "iPhone 13").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_stock_delta() {
        assert!(validate_stock_delta(0).is_ok());
        assert!(validate_stock_delta(5).is_ok());
        assert!(validate_stock_delta(-1).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("owner@shop.af").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@shop.af").is_err());
        assert!(validate_email("owner@localhost").is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let mut product = NewProduct {
            name: "Redmi Note 13".to_string(),
            selling_price_afg: Money::from_minor(1_500_000),
            accessories: vec!["charger".to_string(), "case".to_string()],
            ..Default::default()
        };
        assert!(validate_new_product(&product).is_ok());

        product.accessories.push("  ".to_string());
        assert!(validate_new_product(&product).is_err());

        product.accessories.pop();
        product.cost_price = Money::from_minor(-1);
        assert!(validate_new_product(&product).is_err());
    }

    #[test]
    fn test_validate_new_supplier_optional_email() {
        let supplier = NewSupplier {
            name: "Kabul Mobile Wholesale".to_string(),
            email: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_new_supplier(&supplier).is_ok());

        let bad = NewSupplier {
            email: Some("nope".to_string()),
            ..supplier
        };
        assert!(validate_new_supplier(&bad).is_err());
    }

    #[test]
    fn test_search_query_trimmed() {
        assert_eq!(validate_search_query("  case ").unwrap(), "case");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(50), 50);
        assert_eq!(clamp_limit(1_000_000), 1000);
    }
}

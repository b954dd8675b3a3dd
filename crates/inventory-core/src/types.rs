//! # Master Data Types
//!
//! Products, customers, suppliers and users: the records the ledger's
//! documents point at.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Master Data                                     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │    Supplier     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (rowid)     │   │  id (rowid)     │   │  id (rowid)     │       │
//! │  │  barcode        │   │  customer_number│   │  name           │       │
//! │  │  stock_quantity │   │  total_spent_*  │   │  company_name   │       │
//! │  │  selling_price_*│   │  total_purchases│   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │  StockPolicy    │   │  PaymentType    │       │
//! │  │  email (unique) │   │  Strict         │   │  Cash           │       │
//! │  │  role           │   │  Permissive     │   │  Credit/Partial │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity
//! Every record has an integer `id` (SQLite rowid, used for relations).
//! Customers and sales also carry a business number (`customer_number`,
//! `invoice_number`) that is assigned once and never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{DualAmount, Money};

// =============================================================================
// Stock Policy
// =============================================================================

/// What a stock decrement does when it would take the quantity below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockPolicy {
    /// Reject the decrement with an insufficient-stock error.
    #[default]
    Strict,
    /// Allow negative stock (back orders, counting mistakes fixed later).
    Permissive,
}

impl StockPolicy {
    pub fn allows_negative(&self) -> bool {
        matches!(self, StockPolicy::Permissive)
    }
}

impl fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockPolicy::Strict => write!(f, "strict"),
            StockPolicy::Permissive => write!(f, "permissive"),
        }
    }
}

impl FromStr for StockPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(StockPolicy::Strict),
            "permissive" | "allow_negative" => Ok(StockPolicy::Permissive),
            other => Err(ValidationError::InvalidFormat {
                field: "stock policy".to_string(),
                reason: format!("unknown policy '{}', expected strict or permissive", other),
            }),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product kept in stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    /// Unique when present.
    pub barcode: Option<String>,
    pub category: Option<String>,
    /// On-hand quantity. Negative only under [`StockPolicy::Permissive`].
    pub stock_quantity: i64,
    /// Low-stock threshold: the product is "low" when stock <= this value.
    pub min_stock_alert: i64,
    pub cost_price: Money,
    pub selling_price_afg: Money,
    pub selling_price_usd: Money,
    /// Ordered accessory descriptors ("charger", "case", ...).
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub accessories: Vec<String>,
    pub photo: Option<String>,
    pub created_by: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Selling price on both currency sides.
    #[inline]
    pub fn selling_price(&self) -> DualAmount {
        DualAmount {
            afg: self.selling_price_afg,
            usd: self.selling_price_usd,
        }
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock_quantity <= 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_alert
    }
}

/// Fields for creating or replacing a product.
///
/// `stock_quantity` is the opening (or corrected) on-hand quantity; day to
/// day movements go through sales, purchases and returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub barcode: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default = "default_min_stock_alert")]
    pub min_stock_alert: i64,
    #[serde(default)]
    pub cost_price: Money,
    #[serde(default)]
    pub selling_price_afg: Money,
    #[serde(default)]
    pub selling_price_usd: Money,
    #[serde(default)]
    pub accessories: Vec<String>,
    pub photo: Option<String>,
    pub created_by: Option<i64>,
}

/// Low-stock threshold used when none is given.
pub const DEFAULT_MIN_STOCK_ALERT: i64 = 5;

fn default_min_stock_alert() -> i64 {
    DEFAULT_MIN_STOCK_ALERT
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer and their lifetime purchase statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    /// `CUS000001`, assigned at registration, never reassigned.
    pub customer_number: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub total_purchases: i64,
    pub total_spent_afg: Money,
    pub total_spent_usd: Money,
    #[ts(as = "Option<String>")]
    pub last_purchase_date: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// Fields a caller supplies when registering a customer.
///
/// The number and the statistics are owned by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Returned by customer registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerReceipt {
    pub customer_id: i64,
    pub customer_number: String,
}

// =============================================================================
// Supplier
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub company_name: Option<String>,
    pub company_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    pub company_name: Option<String>,
    pub company_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

/// An operator account.
///
/// The password hash is produced by the host's authentication layer; the
/// ledger only stores it and never serializes it back out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: UserRole,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Editable user profile fields (the password has its own operation).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserUpdate {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub role: UserRole,
}

/// One successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LoginLog {
    pub id: i64,
    pub user_id: i64,
    pub email: String,
    #[ts(as = "String")]
    pub login_date: DateTime<Utc>,
}

// =============================================================================
// Payment Type
// =============================================================================

/// How a purchase was paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentType {
    #[default]
    Cash,
    Credit,
    Partial,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_policy_parsing() {
        assert_eq!("strict".parse::<StockPolicy>().unwrap(), StockPolicy::Strict);
        assert_eq!("Permissive".parse::<StockPolicy>().unwrap(), StockPolicy::Permissive);
        assert!("lenient".parse::<StockPolicy>().is_err());
        assert_eq!(StockPolicy::default(), StockPolicy::Strict);
        assert!(!StockPolicy::Strict.allows_negative());
    }

    #[test]
    fn test_user_password_not_serialized() {
        let user = User {
            id: 1,
            first_name: "Sara".to_string(),
            last_name: None,
            email: "sara@example.com".to_string(),
            password_hash: "secret-hash".to_string(),
            role: UserRole::Admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"admin\""));
    }

    #[test]
    fn test_new_product_defaults() {
        let product: NewProduct = serde_json::from_str(r#"{"name":"Galaxy A15"}"#).unwrap();
        assert_eq!(product.min_stock_alert, DEFAULT_MIN_STOCK_ALERT);
        assert_eq!(product.stock_quantity, 0);
        assert!(product.accessories.is_empty());
    }

    #[test]
    fn test_customer_full_name() {
        let now = Utc::now();
        let mut customer = Customer {
            id: 1,
            customer_number: "CUS000001".to_string(),
            first_name: "Ahmad".to_string(),
            last_name: Some("Karimi".to_string()),
            phone: None,
            total_purchases: 0,
            total_spent_afg: Money::zero(),
            total_spent_usd: Money::zero(),
            last_purchase_date: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(customer.full_name(), "Ahmad Karimi");
        customer.last_name = None;
        assert_eq!(customer.full_name(), "Ahmad");
    }
}

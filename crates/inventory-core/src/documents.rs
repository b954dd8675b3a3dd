//! # Ledger Documents
//!
//! Sales, purchases and returns: every record that moves stock or money.
//! Each document type comes as a stored row (`Sale`, `Purchase`,
//! `SaleReturn`) and a creation request (`NewSale`, `NewPurchase`,
//! `NewReturn`) that carries only what the caller is allowed to choose.
//!
//! ## Stock Direction
//! ```text
//! ┌──────────────┬───────────────────────┬──────────────────────────────┐
//! │ Document     │ Stock effect          │ Money effect                 │
//! ├──────────────┼───────────────────────┼──────────────────────────────┤
//! │ Sale         │ - quantity per line   │ customer spend += final      │
//! │ Purchase     │ + quantity            │ supplier balance += owed     │
//! │ Return       │ + quantity            │ refund recorded, not netted  │
//! └──────────────┴───────────────────────┴──────────────────────────────┘
//! ```
//!
//! Requests validate themselves before any storage work starts; see
//! [`NewSale::validate`] and friends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::{Currency, DualAmount, Money};
use crate::totals::{self, SaleTotals};
use crate::types::PaymentType;
use crate::validation::{validate_id, validate_optional_text, validate_quantity, MAX_NAME_LEN};
use crate::MAX_SALE_LINES;

// =============================================================================
// Sale
// =============================================================================

/// A committed sale header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    /// `INV0000000001`, unique, never reassigned.
    pub invoice_number: String,
    pub customer_id: Option<i64>,
    pub total_amount_afg: Money,
    pub total_amount_usd: Money,
    /// Taken from the `currency` side only.
    pub discount: Money,
    pub final_amount_afg: Money,
    pub final_amount_usd: Money,
    pub currency: Currency,
    pub sold_by: Option<i64>,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
}

impl Sale {
    pub fn total_amount(&self) -> DualAmount {
        DualAmount {
            afg: self.total_amount_afg,
            usd: self.total_amount_usd,
        }
    }

    pub fn final_amount(&self) -> DualAmount {
        DualAmount {
            afg: self.final_amount_afg,
            usd: self.final_amount_usd,
        }
    }
}

/// A sale line. Written once, together with its sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    /// Product name at the time of sale.
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_afg: Money,
    pub unit_price_usd: Money,
    pub total_price_afg: Money,
    pub total_price_usd: Money,
    /// 0 when the line has no warranty.
    pub warranty_value: i64,
    pub warranty_unit: Option<String>,
}

/// A sale header with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Warranty terms printed on a sale line ("12 months").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Warranty {
    pub value: i64,
    pub unit: String,
}

/// One requested sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineRequest {
    pub product_id: i64,
    /// Name printed on the line; blank uses the catalogue name.
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: i64,
    /// Agreed unit price; may differ from the product's list price.
    pub unit_price: DualAmount,
    #[serde(default)]
    pub warranty: Option<Warranty>,
}

impl SaleLineRequest {
    /// Line total on both sides.
    pub fn total(&self) -> CoreResult<DualAmount> {
        totals::line_total(self.unit_price, self.quantity)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_id("product_id", self.product_id)?;
        validate_optional_text("product_name", self.product_name.as_deref(), MAX_NAME_LEN)?;
        validate_quantity(self.quantity)?;
        self.unit_price.ensure_non_negative("unit_price")?;
        if let Some(warranty) = &self.warranty {
            if warranty.value < 0 {
                return Err(ValidationError::MustNotBeNegative {
                    field: "warranty_value".to_string(),
                });
            }
            validate_optional_text("warranty_unit", Some(&warranty.unit), 50)?;
        }
        Ok(())
    }
}

/// Everything needed to record a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub customer_id: Option<i64>,
    pub lines: Vec<SaleLineRequest>,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub currency: Currency,
    pub sold_by: Option<i64>,
}

impl NewSale {
    /// Checks lines, prices and discount without touching storage.
    pub fn validate(&self) -> CoreResult<SaleTotals> {
        if self.lines.is_empty() {
            return Err(ValidationError::Empty {
                field: "lines".to_string(),
            }
            .into());
        }
        if self.lines.len() > MAX_SALE_LINES {
            return Err(ValidationError::OutOfRange {
                field: "lines".to_string(),
                min: 1,
                max: MAX_SALE_LINES as i64,
            }
            .into());
        }
        if let Some(customer_id) = self.customer_id {
            validate_id("customer_id", customer_id)?;
        }
        for line in &self.lines {
            line.validate()?;
        }
        self.totals()
    }

    /// Per-line totals in line order.
    pub fn line_totals(&self) -> CoreResult<Vec<DualAmount>> {
        self.lines.iter().map(SaleLineRequest::total).collect()
    }

    /// Header totals.
    pub fn totals(&self) -> CoreResult<SaleTotals> {
        SaleTotals::compute(&self.line_totals()?, self.discount, self.currency)
    }
}

/// Returned by sale creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleReceipt {
    pub sale_id: i64,
    pub invoice_number: String,
}

// =============================================================================
// Purchase
// =============================================================================

/// Stock bought from a supplier.
///
/// `remaining_balance` always equals `total_cost_afg - amount_paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: i64,
    pub product_id: Option<i64>,
    pub product_name: String,
    pub supplier_id: Option<i64>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub quantity: i64,
    pub unit_cost_price: Money,
    pub total_cost_afg: Money,
    pub total_cost_usd: Money,
    pub payment_type: PaymentType,
    pub amount_paid: Money,
    pub remaining_balance: Money,
    pub photo: Option<String>,
    pub added_by: Option<i64>,
    #[ts(as = "String")]
    pub purchase_date: DateTime<Utc>,
}

/// Everything needed to record a purchase.
///
/// With `product_id` set the product's stock goes up by `quantity`; without
/// it the purchase is recorded for accounting only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchase {
    pub product_id: Option<i64>,
    /// Defaults to the product's name when a product is referenced.
    pub product_name: Option<String>,
    pub supplier_id: Option<i64>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub unit_cost_price: Money,
    #[serde(default)]
    pub total_cost: DualAmount,
    #[serde(default)]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub amount_paid: Money,
    pub photo: Option<String>,
    pub added_by: Option<i64>,
}

impl NewPurchase {
    pub fn validate(&self) -> CoreResult<Money> {
        if let Some(product_id) = self.product_id {
            validate_id("product_id", product_id)?;
        } else if self
            .product_name
            .as_deref()
            .map_or(true, |name| name.trim().is_empty())
        {
            return Err(ValidationError::required("product_name").into());
        }
        if let Some(supplier_id) = self.supplier_id {
            validate_id("supplier_id", supplier_id)?;
        }
        validate_quantity(self.quantity)?;
        validate_purchase_amounts(self.unit_cost_price, self.total_cost, self.amount_paid)
    }
}

/// Editable purchase fields. The referenced product cannot change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseUpdate {
    pub product_name: String,
    pub supplier_id: Option<i64>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub quantity: i64,
    pub unit_cost_price: Money,
    pub total_cost: DualAmount,
    pub payment_type: PaymentType,
    pub amount_paid: Money,
    pub photo: Option<String>,
}

impl PurchaseUpdate {
    pub fn validate(&self) -> CoreResult<Money> {
        if self.product_name.trim().is_empty() {
            return Err(ValidationError::required("product_name").into());
        }
        validate_quantity(self.quantity)?;
        validate_purchase_amounts(self.unit_cost_price, self.total_cost, self.amount_paid)
    }
}

/// Shared amount checks; returns the remaining balance.
fn validate_purchase_amounts(
    unit_cost_price: Money,
    total_cost: DualAmount,
    amount_paid: Money,
) -> CoreResult<Money> {
    unit_cost_price.ensure_non_negative("unit_cost_price")?;
    total_cost.ensure_non_negative("total_cost")?;
    amount_paid.ensure_non_negative("amount_paid")?;
    totals::remaining_balance(total_cost.afg, amount_paid)
}

// =============================================================================
// Return
// =============================================================================

/// Goods brought back against an earlier sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleReturn {
    pub id: i64,
    pub sale_id: i64,
    pub sale_item_id: i64,
    pub product_id: i64,
    pub customer_id: Option<i64>,
    pub quantity: i64,
    pub refund_amount_afg: Money,
    pub refund_amount_usd: Money,
    pub reason: Option<String>,
    pub returned_by: Option<i64>,
    #[ts(as = "String")]
    pub return_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewReturn {
    pub sale_id: i64,
    pub sale_item_id: i64,
    pub product_id: i64,
    pub customer_id: Option<i64>,
    pub quantity: i64,
    #[serde(default)]
    pub refund: DualAmount,
    pub reason: Option<String>,
    pub returned_by: Option<i64>,
}

impl NewReturn {
    pub fn validate(&self) -> CoreResult<()> {
        validate_id("sale_id", self.sale_id)?;
        validate_id("sale_item_id", self.sale_item_id)?;
        validate_id("product_id", self.product_id)?;
        if let Some(customer_id) = self.customer_id {
            validate_id("customer_id", customer_id)?;
        }
        validate_quantity(self.quantity)?;
        self.refund.ensure_non_negative("refund_amount")?;
        validate_optional_text("reason", self.reason.as_deref(), 500)?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

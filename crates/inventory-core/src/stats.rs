//! # Read-Side Views
//!
//! Aggregates and joined rows returned by the query layer. None of these
//! are stored; they are computed by SQL on demand.
//!
//! Averages are `f64` because they are report figures, never fed back into
//! a stored amount.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::documents::{Purchase, Sale, SaleItem, SaleReturn};
use crate::money::Money;

// =============================================================================
// Aggregates
// =============================================================================

/// Sales over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesStats {
    pub total_sales: i64,
    pub total_revenue_afg: Money,
    pub total_revenue_usd: Money,
    pub average_sale_afg: f64,
    pub average_sale_usd: f64,
}

/// Stock position across the whole catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductStats {
    pub total_products: i64,
    pub in_stock: i64,
    pub out_of_stock: i64,
    pub low_stock: i64,
}

/// Purchases over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseStats {
    pub total_purchases: i64,
    pub total_quantity: i64,
    pub total_cost_afg: Money,
    pub total_cost_usd: Money,
    pub average_unit_cost: f64,
    pub outstanding_balance: Money,
}

/// Returns over a trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReturnStats {
    pub total_returns: i64,
    pub total_quantity: i64,
    pub total_refund_afg: Money,
    pub total_refund_usd: Money,
}

// =============================================================================
// Joined Rows
// =============================================================================

/// A sale with the buyer's contact details, for the dashboard feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RecentSale {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub sale: Sale,
    pub customer_first_name: Option<String>,
    pub customer_last_name: Option<String>,
    pub customer_phone: Option<String>,
}

/// A product ranked by units sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductSales {
    pub product_id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub stock_quantity: i64,
    pub total_sold: i64,
}

/// A purchase with its supplier's names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseView {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub purchase: Purchase,
    pub supplier_name: Option<String>,
    pub supplier_company: Option<String>,
}

/// A return with product, customer and invoice context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReturnView {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub sale_return: SaleReturn,
    pub product_name: String,
    pub invoice_number: String,
    pub customer_first_name: Option<String>,
    pub customer_last_name: Option<String>,
}

/// A supplier ranked by purchase volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SupplierSummary {
    pub supplier_id: i64,
    pub name: String,
    pub company_name: Option<String>,
    pub purchase_count: i64,
    pub total_cost_afg: Money,
    pub total_cost_usd: Money,
    pub outstanding_balance: Money,
}

/// One line of a customer's purchase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerPurchase {
    pub sale_id: i64,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub total_price_afg: Money,
    pub total_price_usd: Money,
}

// =============================================================================
// Invoice
// =============================================================================

/// Invoice line: the sale item plus catalogue details for printing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceLine {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub item: SaleItem,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
}

/// Everything an invoice printout needs. Layout is the renderer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub sale: Sale,
    pub customer_number: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub seller_name: Option<String>,
    pub items: Vec<InvoiceLine>,
}

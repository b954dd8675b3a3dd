//! # inventory-core: Pure Ledger Logic
//!
//! This crate holds the business rules of the inventory ledger as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Inventory Ledger Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Renderer (forms, reports, invoices)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ IPC: db:query / db:run / db:get        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    inventory-db                                 │   │
//! │  │   Ledger (transactions) • Repositories • StockLedger • Bridge   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ inventory-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌────────────┐      │   │
//! │  │   │  money   │ │  totals  │ │ identifier │ │ validation │      │   │
//! │  │   │ AFG/USD  │ │ discount │ │ CUS / INV  │ │   rules    │      │   │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └────────────┘      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Master data (Product, Customer, Supplier, User)
//! - [`documents`] - Sales, purchases, returns and their creation requests
//! - [`stats`] - Read-side aggregates and joined views
//! - [`money`] - `Money`, `Currency` and `DualAmount` (integer minor units)
//! - [`totals`] - Line/document totals and discount application
//! - [`identifier`] - Business number formatting (`CUS000001`, `INV0000000001`)
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use inventory_core::money::{Currency, DualAmount, Money};
//! use inventory_core::totals::SaleTotals;
//!
//! let line = inventory_core::totals::line_total(DualAmount::new(100, 1), 3).unwrap();
//! let totals = SaleTotals::compute(&[line], Money::from_minor(50), Currency::Afg).unwrap();
//!
//! assert_eq!(totals.final_amount.afg.minor(), 250);
//! assert_eq!(totals.final_amount.usd.minor(), 3);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod documents;
pub mod error;
pub mod identifier;
pub mod money;
pub mod stats;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use documents::*;
pub use error::{CoreError, CoreResult, ValidationError};
pub use identifier::IdentifierFormat;
pub use money::{Currency, DualAmount, Money};
pub use stats::*;
pub use totals::SaleTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines on a single sale.
pub const MAX_SALE_LINES: usize = 200;

/// Maximum quantity on a single document line.
///
/// Guards against typing 10000 instead of 10; also keeps
/// `unit price × quantity` far away from `i64` overflow for sane prices.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Default number of rows returned by list queries when the caller gives no limit.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

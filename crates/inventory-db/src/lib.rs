//! # inventory-db: Storage and Ledger Layer
//!
//! SQLite persistence for the inventory ledger, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Inventory Ledger Data Flow                         │
//! │                                                                         │
//! │  Renderer / IPC handler                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                  inventory-db (THIS CRATE)                      │    │
//! │  │                                                                 │    │
//! │  │  ┌────────────┐  ┌─────────────┐  ┌──────────────┐  ┌────────┐  │    │
//! │  │  │  Ledger    │  │ Repositories│  │    Store     │  │ Config │  │    │
//! │  │  │ (writes)   │  │ (reads)     │  │ (db:query,   │  │ (toml, │  │    │
//! │  │  │            │  │             │  │  db:run,     │  │  env)  │  │    │
//! │  │  │ StockLedger│  │ products    │  │  db:get)     │  │        │  │    │
//! │  │  │ Identifiers│  │ sales ...   │  │              │  │        │  │    │
//! │  │  └─────┬──────┘  └──────┬──────┘  └──────┬───────┘  └────────┘  │    │
//! │  │        └────────────────┼────────────────┘                      │    │
//! │  │                         ▼                                       │    │
//! │  │                 Database (pool.rs) ── migrations (embedded)     │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool and the [`Database`] handle
//! - [`config`] - `ledger.toml` loading with environment overrides
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - [`DbError`] and the caller-facing [`ErrorKind`]
//! - [`stock`] - Atomic stock adjustments
//! - [`identifiers`] - Customer and invoice numbers
//! - [`ledger`] - Sale, purchase, return and customer transactions
//! - [`repository`] - Read-side queries and reference-data CRUD
//! - [`bridge`] - Raw `db:query` / `db:run` / `db:get` primitives
//!
//! ## Usage
//!
//! ```rust,ignore
//! use inventory_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("inventory.db")).await?;
//!
//! let receipt = db.ledger().create_sale(request).await?;
//! let low = db.products().low_stock().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bridge;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod stock;

// =============================================================================
// Re-exports
// =============================================================================

pub use bridge::{BridgeError, BridgeRequest, BridgeResponse, ExecuteResult, Record, SqlParam, Store};
pub use config::{ConfigError, LedgerConfig, LedgerSettings};
pub use error::{DbError, DbResult, ErrorKind};
pub use identifiers::IdentifierGenerator;
pub use ledger::Ledger;
pub use pool::{Database, DbConfig};
pub use stock::StockLedger;

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::returns::ReturnRepository;
pub use repository::sale::SaleRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::user::UserRepository;

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use inventory_core::{Money, NewProduct, DEFAULT_MIN_STOCK_ALERT};

    use crate::pool::{Database, DbConfig};

    pub async fn memory_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Inserts a product priced 100.00 AFG / 1.50 USD with the default
    /// alert threshold.
    pub async fn insert_product(db: &Database, name: &str, stock: i64) -> i64 {
        let product = NewProduct {
            name: name.to_string(),
            stock_quantity: stock,
            min_stock_alert: DEFAULT_MIN_STOCK_ALERT,
            cost_price: Money::from_minor(8_000),
            selling_price_afg: Money::from_minor(10_000),
            selling_price_usd: Money::from_minor(150),
            ..Default::default()
        };
        db.products().create(&product).await.unwrap().id
    }
}

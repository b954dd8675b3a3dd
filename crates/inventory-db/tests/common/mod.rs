//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::Path;

use inventory_core::{DualAmount, Money, NewProduct, SaleLineRequest, StockPolicy, DEFAULT_MIN_STOCK_ALERT};
use inventory_db::{Database, DbConfig, LedgerSettings};

/// Single-connection in-memory database with default settings.
pub async fn memory_db() -> anyhow::Result<Database> {
    Ok(Database::new(DbConfig::in_memory()).await?)
}

pub async fn memory_db_with_policy(policy: StockPolicy) -> anyhow::Result<Database> {
    let settings = LedgerSettings {
        stock_policy: policy,
        ..LedgerSettings::default()
    };
    Ok(Database::with_settings(DbConfig::in_memory(), settings).await?)
}

/// File-backed database so several pooled connections really contend.
pub async fn file_db(dir: &Path, connections: u32) -> anyhow::Result<Database> {
    let config = DbConfig::new(dir.join("ledger.db")).max_connections(connections);
    Ok(Database::new(config).await?)
}

pub async fn add_product(db: &Database, name: &str, stock: i64) -> anyhow::Result<i64> {
    let product = db
        .products()
        .create(&NewProduct {
            name: name.to_string(),
            stock_quantity: stock,
            min_stock_alert: DEFAULT_MIN_STOCK_ALERT,
            cost_price: Money::from_minor(50),
            selling_price_afg: Money::from_minor(100),
            selling_price_usd: Money::from_minor(1),
            ..Default::default()
        })
        .await?;
    Ok(product.id)
}

pub fn line(product_id: i64, quantity: i64, afg: i64, usd: i64) -> SaleLineRequest {
    SaleLineRequest {
        product_id,
        product_name: None,
        quantity,
        unit_price: DualAmount::new(afg, usd),
        warranty: None,
    }
}

pub async fn stock_of(db: &Database, product_id: i64) -> anyhow::Result<i64> {
    let level = db
        .stock()
        .stock_level(product_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} missing"))?;
    Ok(level)
}

pub async fn count_rows(db: &Database, table: &str) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await?;
    Ok(count)
}

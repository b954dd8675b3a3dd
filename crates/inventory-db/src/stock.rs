//! # Stock Ledger
//!
//! Atomic adjustments of a product's on-hand quantity.
//!
//! ## Single-Statement Adjustments
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ Read-then-write (lost update under concurrency)                 │
//! │     SELECT stock_quantity ...      → 10                             │
//! │     UPDATE ... SET stock_quantity = 7                               │
//! │                                                                     │
//! │  ✅ Relative update, checked in the same statement                  │
//! │     UPDATE products                                                 │
//! │        SET stock_quantity = stock_quantity - 3                      │
//! │      WHERE id = ? AND stock_quantity >= 3     -- strict mode only   │
//! │  RETURNING stock_quantity                     → 7                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The free functions take a `&mut SqliteConnection` so the ledger can run
//! them inside its own transaction. [`StockLedger`] wraps them for one-off
//! adjustments outside a document.

use chrono::Utc;
use inventory_core::validation::validate_stock_delta;
use inventory_core::StockPolicy;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

// =============================================================================
// Connection-Level Operations
// =============================================================================

/// Adds `quantity` to the product's stock and returns the new level.
pub async fn increase(conn: &mut SqliteConnection, product_id: i64, quantity: i64) -> DbResult<i64> {
    validate_stock_delta(quantity)?;
    debug!(product_id, quantity, "Increasing stock");

    let new_level: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?2,
            updated_at = ?3
        WHERE id = ?1
        RETURNING stock_quantity
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    new_level.ok_or_else(|| DbError::not_found("Product", product_id))
}

/// Removes `quantity` from the product's stock and returns the new level.
///
/// Under [`StockPolicy::Strict`] the update only matches while enough stock
/// is on hand; a miss is then resolved into `NotFound` or
/// `InsufficientStock`.
pub async fn decrease(
    conn: &mut SqliteConnection,
    product_id: i64,
    quantity: i64,
    policy: StockPolicy,
) -> DbResult<i64> {
    validate_stock_delta(quantity)?;
    debug!(product_id, quantity, %policy, "Decreasing stock");

    let new_level: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - ?2,
            updated_at = ?3
        WHERE id = ?1
          AND (?4 OR stock_quantity >= ?2)
        RETURNING stock_quantity
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .bind(policy.allows_negative())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(level) = new_level {
        return Ok(level);
    }

    match current_level(conn, product_id).await? {
        None => Err(DbError::not_found("Product", product_id)),
        Some(available) => Err(DbError::InsufficientStock {
            product_id,
            available,
            requested: quantity,
        }),
    }
}

/// Overwrites the stock level (stock-take corrections).
pub async fn set_level(conn: &mut SqliteConnection, product_id: i64, quantity: i64) -> DbResult<i64> {
    validate_stock_delta(quantity)?;
    debug!(product_id, quantity, "Setting stock level");

    let new_level: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock_quantity = ?2,
            updated_at = ?3
        WHERE id = ?1
        RETURNING stock_quantity
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    new_level.ok_or_else(|| DbError::not_found("Product", product_id))
}

/// Current stock level, `None` when the product doesn't exist.
pub async fn current_level(conn: &mut SqliteConnection, product_id: i64) -> DbResult<Option<i64>> {
    let level = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(level)
}

// =============================================================================
// Stock Ledger Handle
// =============================================================================

/// Pool-backed stock adjustments, each one its own atomic statement.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    policy: StockPolicy,
}

impl StockLedger {
    pub fn new(pool: SqlitePool, policy: StockPolicy) -> Self {
        StockLedger { pool, policy }
    }

    pub fn policy(&self) -> StockPolicy {
        self.policy
    }

    pub async fn increase_stock(&self, product_id: i64, quantity: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        increase(&mut conn, product_id, quantity).await
    }

    pub async fn decrease_stock(&self, product_id: i64, quantity: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        decrease(&mut conn, product_id, quantity, self.policy).await
    }

    pub async fn set_stock(&self, product_id: i64, quantity: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        set_level(&mut conn, product_id, quantity).await
    }

    pub async fn stock_level(&self, product_id: i64) -> DbResult<Option<i64>> {
        let mut conn = self.pool.acquire().await?;
        current_level(&mut conn, product_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{insert_product, memory_db};

    #[tokio::test]
    async fn test_increase_and_decrease() {
        let db = memory_db().await;
        let id = insert_product(&db, "Nokia 105", 10).await;
        let stock = db.stock();

        assert_eq!(stock.increase_stock(id, 5).await.unwrap(), 15);
        assert_eq!(stock.decrease_stock(id, 3).await.unwrap(), 12);
        assert_eq!(stock.stock_level(id).await.unwrap(), Some(12));
    }

    #[tokio::test]
    async fn test_strict_policy_blocks_oversell() {
        let db = memory_db().await;
        let id = insert_product(&db, "Nokia 105", 2).await;

        let err = db.stock().decrease_stock(id, 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert!(matches!(
            err,
            DbError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));
        assert_eq!(db.stock().stock_level(id).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_permissive_policy_allows_negative() {
        let db = memory_db().await;
        let id = insert_product(&db, "Nokia 105", 2).await;
        let stock = StockLedger::new(db.pool().clone(), StockPolicy::Permissive);

        assert_eq!(stock.decrease_stock(id, 5).await.unwrap(), -3);
    }

    #[tokio::test]
    async fn test_missing_product() {
        let db = memory_db().await;

        let err = db.stock().increase_stock(999, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = db.stock().decrease_stock(999, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_negative_quantity_rejected() {
        let db = memory_db().await;
        let id = insert_product(&db, "Nokia 105", 2).await;

        let err = db.stock().increase_stock(id, -1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = db.stock().set_stock(id, -1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_set_stock() {
        let db = memory_db().await;
        let id = insert_product(&db, "Nokia 105", 2).await;

        assert_eq!(db.stock().set_stock(id, 40).await.unwrap(), 40);
    }
}

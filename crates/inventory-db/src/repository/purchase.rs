//! # Purchase Repository
//!
//! Purchase queries and statistics. Creating and editing purchases goes
//! through the [`Ledger`](crate::ledger::Ledger) because it moves stock and
//! recomputes the supplier balance.

use chrono::{DateTime, Utc};
use inventory_core::{Purchase, PurchaseStats, PurchaseView};
use sqlx::SqlitePool;
use tracing::info;

use super::window_start;
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
    default_window_days: i64,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool, default_window_days: i64) -> Self {
        PurchaseRepository {
            pool,
            default_window_days,
        }
    }

    /// A purchase with its supplier's name and company.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<PurchaseView>> {
        let view = sqlx::query_as(
            r#"
            SELECT
                p.*,
                s.name AS supplier_name,
                s.company_name AS supplier_company
            FROM purchases p
            LEFT JOIN suppliers s ON s.id = p.supplier_id
            WHERE p.id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(view)
    }

    /// All purchases with supplier names, newest first.
    pub async fn list(&self) -> DbResult<Vec<PurchaseView>> {
        let views = sqlx::query_as(
            r#"
            SELECT
                p.*,
                s.name AS supplier_name,
                s.company_name AS supplier_company
            FROM purchases p
            LEFT JOIN suppliers s ON s.id = p.supplier_id
            ORDER BY p.purchase_date DESC, p.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(views)
    }

    pub async fn by_supplier(&self, supplier_id: i64) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as(
            "SELECT * FROM purchases WHERE supplier_id = ?1 ORDER BY purchase_date DESC, id DESC",
        )
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }

    pub async fn by_date_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as(
            r#"
            SELECT * FROM purchases
            WHERE purchase_date >= ?1 AND purchase_date <= ?2
            ORDER BY purchase_date DESC, id DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }

    pub async fn stats(&self, window_days: Option<i64>) -> DbResult<PurchaseStats> {
        let since = window_start(window_days.unwrap_or(self.default_window_days));

        let stats = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_purchases,
                COALESCE(SUM(quantity), 0) AS total_quantity,
                COALESCE(SUM(total_cost_afg), 0) AS total_cost_afg,
                COALESCE(SUM(total_cost_usd), 0) AS total_cost_usd,
                COALESCE(AVG(unit_cost_price), 0.0) AS average_unit_cost,
                COALESCE(SUM(remaining_balance), 0) AS outstanding_balance
            FROM purchases
            WHERE purchase_date >= ?1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Deletes the purchase record only; stock already received stays.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM purchases WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        info!(purchase_id = id, "Purchase deleted");
        Ok(())
    }
}

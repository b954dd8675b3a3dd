//! # Return Repository
//!
//! Queries over returned goods. Returns are recorded by
//! [`Ledger::create_return`](crate::ledger::Ledger::create_return).

use inventory_core::{ReturnStats, ReturnView, SaleReturn};
use sqlx::SqlitePool;

use super::window_start;
use crate::error::DbResult;

/// Shared projection: the return row, product name, invoice and buyer.
const RETURN_VIEW: &str = r#"
    SELECT
        r.*,
        p.name AS product_name,
        s.invoice_number,
        c.first_name AS customer_first_name,
        c.last_name AS customer_last_name
    FROM returns r
    JOIN products p ON p.id = r.product_id
    JOIN sales s ON s.id = r.sale_id
    LEFT JOIN customers c ON c.id = r.customer_id
"#;

#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
    default_window_days: i64,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool, default_window_days: i64) -> Self {
        ReturnRepository {
            pool,
            default_window_days,
        }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<SaleReturn>> {
        let row = sqlx::query_as("SELECT * FROM returns WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// All returns with product and customer names, newest first.
    pub async fn list(&self) -> DbResult<Vec<ReturnView>> {
        let sql = format!("{RETURN_VIEW} ORDER BY r.return_date DESC, r.id DESC");
        let rows = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn by_customer(&self, customer_id: i64) -> DbResult<Vec<ReturnView>> {
        let sql = format!("{RETURN_VIEW} WHERE r.customer_id = ?1 ORDER BY r.return_date DESC, r.id DESC");
        let rows = sqlx::query_as(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn by_sale(&self, sale_id: i64) -> DbResult<Vec<ReturnView>> {
        let sql = format!("{RETURN_VIEW} WHERE r.sale_id = ?1 ORDER BY r.return_date DESC, r.id DESC");
        let rows = sqlx::query_as(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn stats(&self, window_days: Option<i64>) -> DbResult<ReturnStats> {
        let since = window_start(window_days.unwrap_or(self.default_window_days));

        let stats = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_returns,
                COALESCE(SUM(quantity), 0) AS total_quantity,
                COALESCE(SUM(refund_amount_afg), 0) AS total_refund_afg,
                COALESCE(SUM(refund_amount_usd), 0) AS total_refund_usd
            FROM returns
            WHERE return_date >= ?1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

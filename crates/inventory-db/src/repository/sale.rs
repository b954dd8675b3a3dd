//! # Sale Repository
//!
//! Read access to committed sales. Sales are written only by
//! [`Ledger::create_sale`](crate::ledger::Ledger::create_sale) and never
//! change afterwards, so everything here is a plain query.
//!
//! ## Windows
//! ```text
//! today()           sale_date >= 00:00 UTC of the current day
//! stats(Some(7))    sale_date >= now - 7 days
//! stats(None)       sale_date >= now - [reports] default_window_days
//! by_date_range     from <= sale_date <= to (inclusive)
//! ```

use chrono::{DateTime, Utc};
use inventory_core::validation::clamp_limit;
use inventory_core::{RecentSale, Sale, SaleItem, SaleWithItems, SalesStats};
use sqlx::SqlitePool;

use super::{start_of_today, window_start};
use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    default_window_days: i64,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool, default_window_days: i64) -> Self {
        SaleRepository {
            pool,
            default_window_days,
        }
    }

    /// A sale with its lines.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<SaleWithItems>> {
        let sale: Option<Sale> = sqlx::query_as("SELECT * FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        self.with_items(sale).await
    }

    pub async fn get_by_invoice(&self, invoice_number: &str) -> DbResult<Option<SaleWithItems>> {
        let sale: Option<Sale> = sqlx::query_as("SELECT * FROM sales WHERE invoice_number = ?1")
            .bind(invoice_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        self.with_items(sale).await
    }

    /// Lines of a sale in entry order.
    pub async fn items(&self, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as("SELECT * FROM sale_items WHERE sale_id = ?1 ORDER BY id")
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Newest sales first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as("SELECT * FROM sales ORDER BY sale_date DESC, id DESC LIMIT ?1")
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    pub async fn by_date_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as(
            "SELECT * FROM sales WHERE sale_date >= ?1 AND sale_date <= ?2 ORDER BY sale_date DESC, id DESC",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    pub async fn today(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as("SELECT * FROM sales WHERE sale_date >= ?1 ORDER BY sale_date DESC, id DESC")
            .bind(start_of_today())
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    /// Newest sales with the buyer's name and phone (walk-in sales have none).
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<RecentSale>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                s.*,
                c.first_name AS customer_first_name,
                c.last_name AS customer_last_name,
                c.phone AS customer_phone
            FROM sales s
            LEFT JOIN customers c ON c.id = s.customer_id
            ORDER BY s.sale_date DESC, s.id DESC
            LIMIT ?1
            "#,
        )
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Count, revenue and average sale over a trailing window of days.
    pub async fn stats(&self, window_days: Option<i64>) -> DbResult<SalesStats> {
        let since = window_start(window_days.unwrap_or(self.default_window_days));

        let stats = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_sales,
                COALESCE(SUM(final_amount_afg), 0) AS total_revenue_afg,
                COALESCE(SUM(final_amount_usd), 0) AS total_revenue_usd,
                COALESCE(AVG(final_amount_afg), 0.0) AS average_sale_afg,
                COALESCE(AVG(final_amount_usd), 0.0) AS average_sale_usd
            FROM sales
            WHERE sale_date >= ?1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn with_items(&self, sale: Option<Sale>) -> DbResult<Option<SaleWithItems>> {
        match sale {
            Some(sale) => {
                let items = self.items(sale.id).await?;
                Ok(Some(SaleWithItems { sale, items }))
            }
            None => Ok(None),
        }
    }
}

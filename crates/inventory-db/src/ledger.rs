//! # Ledger Transactions
//!
//! Every multi-table write of the system: sales, purchases, returns and
//! customer registration. Each operation runs in one explicit transaction.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewSale::validate()            pure, nothing opened yet                │
//! │       │                                                                 │
//! │  BEGIN                                                                  │
//! │   ├── 1. allocate invoice number     (first write, takes the lock)      │
//! │   ├── 2. check customer / products   → NotFound                         │
//! │   ├── 3. INSERT sales header                                            │
//! │   ├── 4. per line: INSERT sale_items, decrease stock                    │
//! │   │                                  → InsufficientStock (strict)       │
//! │   └── 5. customer aggregates += 1 purchase, += final amounts            │
//! │  COMMIT ──► SaleReceipt { sale_id, invoice_number }                     │
//! │                                                                         │
//! │  any error ──► ROLLBACK ──► the original error, unchanged               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lock Ordering
//! SQLite upgrades a reader to a writer lazily. A transaction that reads
//! first and writes later can fail with a stale snapshot when another
//! writer commits in between, so every transaction here starts with a
//! write.

use chrono::{DateTime, Utc};
use inventory_core::validation::validate_new_customer;
use inventory_core::{
    CustomerReceipt, DualAmount, NewCustomer, NewPurchase, NewReturn, NewSale, Purchase,
    PurchaseUpdate, SaleReceipt, SaleTotals, ValidationError,
};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, error, info, warn};

use crate::config::LedgerSettings;
use crate::error::{DbError, DbResult};
use crate::identifiers::{self, Sequence};
use crate::stock;

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Commits on success; otherwise rolls back and hands back the first error.
///
/// A failed rollback is logged and swallowed. Dropping the transaction rolls
/// back as well, so the connection is never returned with an open write.
pub(crate) async fn finish<T>(
    tx: Transaction<'_, Sqlite>,
    result: DbResult<T>,
    operation: &'static str,
) -> DbResult<T> {
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            Ok(value)
        }
        Err(err) => {
            warn!(operation, error = %err, "Rolling back transaction");
            if let Err(rollback_err) = tx.rollback().await {
                error!(operation, error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Takes the write lock with a no-op write for transactions whose first
/// real step is a read.
async fn claim_write_lock(conn: &mut SqliteConnection) -> DbResult<()> {
    sqlx::query("UPDATE sequences SET value = value WHERE name = ?1")
        .bind(Sequence::InvoiceNumber.name())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn ensure_exists(
    conn: &mut SqliteConnection,
    sql: &'static str,
    entity: &'static str,
    id: i64,
) -> DbResult<()> {
    let found: bool = sqlx::query_scalar(sql).bind(id).fetch_one(&mut *conn).await?;
    if found {
        Ok(())
    } else {
        Err(DbError::not_found(entity, id))
    }
}

async fn ensure_customer(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    ensure_exists(conn, "SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?1)", "Customer", id).await
}

async fn ensure_supplier(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    ensure_exists(conn, "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = ?1)", "Supplier", id).await
}

async fn product_name(conn: &mut SqliteConnection, product_id: i64) -> DbResult<String> {
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;
    name.ok_or_else(|| DbError::not_found("Product", product_id))
}

// =============================================================================
// Ledger
// =============================================================================

/// Transaction coordinator for documents that touch several tables.
///
/// ## Usage
/// ```rust,ignore
/// let receipt = db.ledger().create_sale(&request).await?;
/// println!("Invoice {}", receipt.invoice_number);
/// ```
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
    settings: LedgerSettings,
}

impl Ledger {
    pub fn new(pool: SqlitePool, settings: LedgerSettings) -> Self {
        Ledger { pool, settings }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale with its lines, stock movements and customer totals.
    ///
    /// ## Errors
    /// - `Validation` for empty lines, bad quantities or prices, too large a discount
    /// - `NotFound` for an unknown customer or product
    /// - `InsufficientStock` when a line oversells under the strict policy
    ///
    /// On any error nothing is written and the invoice number is not consumed.
    pub async fn create_sale(&self, request: &NewSale) -> DbResult<SaleReceipt> {
        let totals = request.validate()?;
        let line_totals = request.line_totals()?;

        debug!(
            lines = request.lines.len(),
            currency = %totals.currency,
            "Creating sale"
        );

        let mut tx = self.pool.begin().await?;
        let result = self.write_sale(&mut tx, request, &totals, &line_totals).await;
        let receipt = finish(tx, result, "create_sale").await?;

        info!(
            sale_id = receipt.sale_id,
            invoice_number = %receipt.invoice_number,
            final_afg = %totals.final_amount.afg,
            final_usd = %totals.final_amount.usd,
            "Sale recorded"
        );
        Ok(receipt)
    }

    async fn write_sale(
        &self,
        conn: &mut SqliteConnection,
        request: &NewSale,
        totals: &SaleTotals,
        line_totals: &[DualAmount],
    ) -> DbResult<SaleReceipt> {
        let invoice_number = identifiers::next_invoice_number(conn, &self.settings.invoice_format).await?;

        if let Some(customer_id) = request.customer_id {
            ensure_customer(conn, customer_id).await?;
        }

        let mut names = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let catalogue = product_name(conn, line.product_id).await?;
            let name = match line.product_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                Some(name) => name.to_string(),
                None => catalogue,
            };
            names.push(name);
        }

        let sale_date = Utc::now();

        let sale_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sales (
                invoice_number, customer_id,
                total_amount_afg, total_amount_usd,
                discount,
                final_amount_afg, final_amount_usd,
                currency, sold_by, sale_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING id
            "#,
        )
        .bind(&invoice_number)
        .bind(request.customer_id)
        .bind(totals.total_amount.afg)
        .bind(totals.total_amount.usd)
        .bind(totals.discount)
        .bind(totals.final_amount.afg)
        .bind(totals.final_amount.usd)
        .bind(totals.currency)
        .bind(request.sold_by)
        .bind(sale_date)
        .fetch_one(&mut *conn)
        .await?;

        for ((line, line_total), name) in request.lines.iter().zip(line_totals).zip(&names) {
            let (warranty_value, warranty_unit) = match &line.warranty {
                Some(w) => (w.value, Some(w.unit.as_str())),
                None => (0, None),
            };

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    sale_id, product_id, product_name, quantity,
                    unit_price_afg, unit_price_usd,
                    total_price_afg, total_price_usd,
                    warranty_value, warranty_unit
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(sale_id)
            .bind(line.product_id)
            .bind(name)
            .bind(line.quantity)
            .bind(line.unit_price.afg)
            .bind(line.unit_price.usd)
            .bind(line_total.afg)
            .bind(line_total.usd)
            .bind(warranty_value)
            .bind(warranty_unit)
            .execute(&mut *conn)
            .await?;

            stock::decrease(conn, line.product_id, line.quantity, self.settings.stock_policy).await?;
        }

        if let Some(customer_id) = request.customer_id {
            record_customer_purchase(conn, customer_id, totals.final_amount, sale_date).await?;
        }

        Ok(SaleReceipt {
            sale_id,
            invoice_number,
        })
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Records stock bought from a supplier and returns the purchase id.
    ///
    /// With a `product_id` the product's stock goes up by the purchased
    /// quantity; without one the row is kept for accounting only.
    pub async fn create_purchase(&self, request: &NewPurchase) -> DbResult<i64> {
        let remaining_balance = request.validate()?;

        let mut tx = self.pool.begin().await?;
        let result = write_purchase(&mut tx, request, remaining_balance.minor()).await;
        let purchase_id = finish(tx, result, "create_purchase").await?;

        info!(
            purchase_id,
            product_id = ?request.product_id,
            quantity = request.quantity,
            remaining_balance = %remaining_balance,
            "Purchase recorded"
        );
        Ok(purchase_id)
    }

    /// Rewrites a purchase's editable fields and recomputes its balance.
    ///
    /// Stock is left alone even when the quantity changes.
    pub async fn update_purchase(&self, id: i64, update: &PurchaseUpdate) -> DbResult<Purchase> {
        let remaining_balance = update.validate()?;

        let mut tx = self.pool.begin().await?;
        let result = rewrite_purchase(&mut tx, id, update, remaining_balance.minor()).await;
        let purchase = finish(tx, result, "update_purchase").await?;

        info!(purchase_id = id, remaining_balance = %remaining_balance, "Purchase updated");
        Ok(purchase)
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// Takes goods back against a sale line and returns the return id.
    ///
    /// Restocks the product. The original sale and the customer's totals
    /// are not adjusted.
    pub async fn create_return(&self, request: &NewReturn) -> DbResult<i64> {
        request.validate()?;

        let mut tx = self.pool.begin().await?;
        let result = write_return(&mut tx, request).await;
        let return_id = finish(tx, result, "create_return").await?;

        info!(
            return_id,
            sale_id = request.sale_id,
            product_id = request.product_id,
            quantity = request.quantity,
            "Return recorded"
        );
        Ok(return_id)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Creates a customer with a freshly allocated customer number.
    pub async fn register_customer(&self, request: &NewCustomer) -> DbResult<CustomerReceipt> {
        validate_new_customer(request)?;

        let mut tx = self.pool.begin().await?;
        let result = self.write_customer(&mut tx, request).await;
        let receipt = finish(tx, result, "register_customer").await?;

        info!(
            customer_id = receipt.customer_id,
            customer_number = %receipt.customer_number,
            "Customer registered"
        );
        Ok(receipt)
    }

    async fn write_customer(&self, conn: &mut SqliteConnection, request: &NewCustomer) -> DbResult<CustomerReceipt> {
        let customer_number =
            identifiers::next_customer_number(conn, &self.settings.customer_format).await?;
        let now = Utc::now();

        let customer_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO customers (customer_number, first_name, last_name, phone, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            RETURNING id
            "#,
        )
        .bind(&customer_number)
        .bind(request.first_name.trim())
        .bind(request.last_name.as_deref())
        .bind(request.phone.as_deref())
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(CustomerReceipt {
            customer_id,
            customer_number,
        })
    }
}

// =============================================================================
// Transaction Bodies
// =============================================================================

async fn record_customer_purchase(
    conn: &mut SqliteConnection,
    customer_id: i64,
    spent: DualAmount,
    sale_date: DateTime<Utc>,
) -> DbResult<()> {
    let updated = sqlx::query(
        r#"
        UPDATE customers
        SET total_purchases = total_purchases + 1,
            total_spent_afg = total_spent_afg + ?2,
            total_spent_usd = total_spent_usd + ?3,
            last_purchase_date = ?4,
            updated_at = ?4
        WHERE id = ?1
        "#,
    )
    .bind(customer_id)
    .bind(spent.afg)
    .bind(spent.usd)
    .bind(sale_date)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", customer_id));
    }
    Ok(())
}

async fn write_purchase(conn: &mut SqliteConnection, request: &NewPurchase, remaining_balance: i64) -> DbResult<i64> {
    let name = match request.product_id {
        Some(product_id) => {
            stock::increase(conn, product_id, request.quantity).await?;
            match request.product_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                Some(name) => name.to_string(),
                None => product_name(conn, product_id).await?,
            }
        }
        None => {
            claim_write_lock(conn).await?;
            // validate() guarantees a name without a product
            request.product_name.as_deref().unwrap_or_default().trim().to_string()
        }
    };

    if let Some(supplier_id) = request.supplier_id {
        ensure_supplier(conn, supplier_id).await?;
    }

    let purchase_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO purchases (
            product_id, product_name, supplier_id, category, brand, barcode,
            quantity, unit_cost_price, total_cost_afg, total_cost_usd,
            payment_type, amount_paid, remaining_balance, photo, added_by,
            purchase_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        RETURNING id
        "#,
    )
    .bind(request.product_id)
    .bind(name)
    .bind(request.supplier_id)
    .bind(request.category.as_deref())
    .bind(request.brand.as_deref())
    .bind(request.barcode.as_deref())
    .bind(request.quantity)
    .bind(request.unit_cost_price)
    .bind(request.total_cost.afg)
    .bind(request.total_cost.usd)
    .bind(request.payment_type)
    .bind(request.amount_paid)
    .bind(remaining_balance)
    .bind(request.photo.as_deref())
    .bind(request.added_by)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(purchase_id)
}

async fn rewrite_purchase(
    conn: &mut SqliteConnection,
    id: i64,
    update: &PurchaseUpdate,
    remaining_balance: i64,
) -> DbResult<Purchase> {
    claim_write_lock(conn).await?;

    if let Some(supplier_id) = update.supplier_id {
        ensure_supplier(conn, supplier_id).await?;
    }

    let purchase: Option<Purchase> = sqlx::query_as(
        r#"
        UPDATE purchases
        SET product_name = ?2,
            supplier_id = ?3,
            category = ?4,
            brand = ?5,
            barcode = ?6,
            quantity = ?7,
            unit_cost_price = ?8,
            total_cost_afg = ?9,
            total_cost_usd = ?10,
            payment_type = ?11,
            amount_paid = ?12,
            remaining_balance = ?13,
            photo = ?14
        WHERE id = ?1
        RETURNING id, product_id, product_name, supplier_id, category, brand, barcode,
                  quantity, unit_cost_price, total_cost_afg, total_cost_usd,
                  payment_type, amount_paid, remaining_balance, photo, added_by,
                  purchase_date
        "#,
    )
    .bind(id)
    .bind(update.product_name.trim())
    .bind(update.supplier_id)
    .bind(update.category.as_deref())
    .bind(update.brand.as_deref())
    .bind(update.barcode.as_deref())
    .bind(update.quantity)
    .bind(update.unit_cost_price)
    .bind(update.total_cost.afg)
    .bind(update.total_cost.usd)
    .bind(update.payment_type)
    .bind(update.amount_paid)
    .bind(remaining_balance)
    .bind(update.photo.as_deref())
    .fetch_optional(&mut *conn)
    .await?;

    purchase.ok_or_else(|| DbError::not_found("Purchase", id))
}

#[derive(sqlx::FromRow)]
struct SoldLine {
    sale_id: i64,
    product_id: i64,
    quantity: i64,
}

async fn write_return(conn: &mut SqliteConnection, request: &NewReturn) -> DbResult<i64> {
    stock::increase(conn, request.product_id, request.quantity).await?;

    ensure_exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM sales WHERE id = ?1)",
        "Sale",
        request.sale_id,
    )
    .await?;

    let line: SoldLine = sqlx::query_as("SELECT sale_id, product_id, quantity FROM sale_items WHERE id = ?1")
        .bind(request.sale_item_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("SaleItem", request.sale_item_id))?;

    if line.sale_id != request.sale_id {
        return Err(ValidationError::InvalidFormat {
            field: "sale_item_id".to_string(),
            reason: format!("item does not belong to sale {}", request.sale_id),
        }
        .into());
    }
    if line.product_id != request.product_id {
        return Err(ValidationError::InvalidFormat {
            field: "product_id".to_string(),
            reason: format!("item {} sold a different product", request.sale_item_id),
        }
        .into());
    }

    if let Some(customer_id) = request.customer_id {
        ensure_customer(conn, customer_id).await?;
    }

    let already_returned: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM returns WHERE sale_item_id = ?1")
            .bind(request.sale_item_id)
            .fetch_one(&mut *conn)
            .await?;

    let returnable = line.quantity - already_returned;
    if request.quantity > returnable {
        return Err(ValidationError::ExceedsLimit {
            field: "quantity".to_string(),
            value: request.quantity,
            max: returnable,
        }
        .into());
    }

    let return_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO returns (
            sale_id, sale_item_id, product_id, customer_id, quantity,
            refund_amount_afg, refund_amount_usd, reason, returned_by, return_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        RETURNING id
        "#,
    )
    .bind(request.sale_id)
    .bind(request.sale_item_id)
    .bind(request.product_id)
    .bind(request.customer_id)
    .bind(request.quantity)
    .bind(request.refund.afg)
    .bind(request.refund.usd)
    .bind(request.reason.as_deref())
    .bind(request.returned_by)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(return_id)
}

// =============================================================================
// Unit Tests
// =============================================================================

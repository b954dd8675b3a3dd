//! # Identifier Generator
//!
//! Customer and invoice numbers backed by the `sequences` table.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   ├── UPDATE sequences SET value = value + 1                            │
//! │   │   WHERE name = 'invoice_number' RETURNING value       → 42          │
//! │   ├── format  → INV0000000042                                           │
//! │   ├── already in sales? ── yes ──► bump again (bounded)                 │
//! │   │                        no                                           │
//! │   ├── INSERT INTO sales (...) VALUES ('INV0000000042', ...)             │
//! │  COMMIT   (ROLLBACK also returns the number to the counter)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The bump is the first write of the enclosing transaction, so the writer
//! holds the database lock from then on and two transactions can never see
//! the same value.

use inventory_core::IdentifierFormat;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::ledger::finish;

/// Upper bound on sequence bumps while skipping numbers already taken.
const MAX_ATTEMPTS: usize = 32;

/// The two counters and where their numbers end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    CustomerNumber,
    InvoiceNumber,
}

impl Sequence {
    pub fn name(&self) -> &'static str {
        match self {
            Sequence::CustomerNumber => "customer_number",
            Sequence::InvoiceNumber => "invoice_number",
        }
    }

    fn exists_query(&self) -> &'static str {
        match self {
            Sequence::CustomerNumber => {
                "SELECT EXISTS(SELECT 1 FROM customers WHERE customer_number = ?1)"
            }
            Sequence::InvoiceNumber => {
                "SELECT EXISTS(SELECT 1 FROM sales WHERE invoice_number = ?1)"
            }
        }
    }
}

// =============================================================================
// Connection-Level Operations
// =============================================================================

/// Advances a counter and returns its new value.
pub async fn next_value(conn: &mut SqliteConnection, sequence: Sequence) -> DbResult<i64> {
    let value: Option<i64> =
        sqlx::query_scalar("UPDATE sequences SET value = value + 1 WHERE name = ?1 RETURNING value")
            .bind(sequence.name())
            .fetch_optional(&mut *conn)
            .await?;

    value.ok_or_else(|| DbError::not_found("Sequence", sequence.name()))
}

/// Allocates the next unused identifier for `sequence`.
///
/// Numbers already present in the target table (rows written by an older
/// client, manual inserts) are skipped. Gives up with `UniqueViolation`
/// after [`MAX_ATTEMPTS`] taken numbers in a row.
pub async fn allocate(
    conn: &mut SqliteConnection,
    sequence: Sequence,
    format: &IdentifierFormat,
) -> DbResult<String> {
    for _ in 0..MAX_ATTEMPTS {
        let value = next_value(conn, sequence).await?;
        let candidate = format.format(value);

        let taken: bool = sqlx::query_scalar(sequence.exists_query())
            .bind(&candidate)
            .fetch_one(&mut *conn)
            .await?;

        if !taken {
            debug!(sequence = sequence.name(), identifier = %candidate, "Allocated identifier");
            return Ok(candidate);
        }

        warn!(sequence = sequence.name(), identifier = %candidate, "Identifier already in use, skipping");
    }

    Err(DbError::duplicate(
        sequence.name(),
        format!("no free value after {} attempts", MAX_ATTEMPTS),
    ))
}

pub async fn next_customer_number(conn: &mut SqliteConnection, format: &IdentifierFormat) -> DbResult<String> {
    allocate(conn, Sequence::CustomerNumber, format).await
}

pub async fn next_invoice_number(conn: &mut SqliteConnection, format: &IdentifierFormat) -> DbResult<String> {
    allocate(conn, Sequence::InvoiceNumber, format).await
}

// =============================================================================
// Generator Handle
// =============================================================================

/// Stand-alone number allocation, one transaction per call.
///
/// A number handed out here is consumed for good; the ledger allocates its
/// own numbers inside the document transaction instead.
#[derive(Debug, Clone)]
pub struct IdentifierGenerator {
    pool: SqlitePool,
    customer_format: IdentifierFormat,
    invoice_format: IdentifierFormat,
}

impl IdentifierGenerator {
    pub fn new(pool: SqlitePool, customer_format: IdentifierFormat, invoice_format: IdentifierFormat) -> Self {
        IdentifierGenerator {
            pool,
            customer_format,
            invoice_format,
        }
    }

    pub async fn next_customer_number(&self) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;
        let result = next_customer_number(&mut tx, &self.customer_format).await;
        finish(tx, result, "next_customer_number").await
    }

    pub async fn next_invoice_number(&self) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;
        let result = next_invoice_number(&mut tx, &self.invoice_format).await;
        finish(tx, result, "next_invoice_number").await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_db;

    #[tokio::test]
    async fn test_numbers_are_sequential() {
        let db = memory_db().await;
        let ids = db.identifiers();

        assert_eq!(ids.next_customer_number().await.unwrap(), "CUS000001");
        assert_eq!(ids.next_customer_number().await.unwrap(), "CUS000002");
        assert_eq!(ids.next_invoice_number().await.unwrap(), "INV0000000001");
    }

    #[tokio::test]
    async fn test_taken_numbers_are_skipped() {
        let db = memory_db().await;

        sqlx::query(
            "INSERT INTO customers (customer_number, first_name, created_at, updated_at)
             VALUES ('CUS000001', 'Legacy', '', ''), ('CUS000002', 'Legacy', '', '')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        assert_eq!(db.identifiers().next_customer_number().await.unwrap(), "CUS000003");
    }

    #[tokio::test]
    async fn test_rolled_back_number_is_reissued() {
        let db = memory_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        let first = next_invoice_number(&mut tx, &IdentifierFormat::invoice()).await.unwrap();
        tx.rollback().await.unwrap();

        let second = db.identifiers().next_invoice_number().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_custom_format() {
        let db = memory_db().await;
        let ids = IdentifierGenerator::new(
            db.pool().clone(),
            IdentifierFormat::new("C-", 3),
            IdentifierFormat::invoice(),
        );

        assert_eq!(ids.next_customer_number().await.unwrap(), "C-001");
    }
}

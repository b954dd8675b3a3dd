//! # Supplier Repository
//!
//! Supplier CRUD plus the two purchase roll-ups the dashboard shows: who we
//! buy the most from, and how much we still owe each supplier.

use chrono::Utc;
use inventory_core::validation::{validate_new_supplier, validate_search_query};
use inventory_core::{Money, NewSupplier, Supplier, SupplierSummary};
use sqlx::SqlitePool;
use tracing::info;

use super::like_pattern;
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn create(&self, supplier: &NewSupplier) -> DbResult<Supplier> {
        validate_new_supplier(supplier)?;
        let now = Utc::now();

        let created: Supplier = sqlx::query_as(
            r#"
            INSERT INTO suppliers (name, company_name, company_phone, email, address, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING *
            "#,
        )
        .bind(supplier.name.trim())
        .bind(supplier.company_name.as_deref())
        .bind(supplier.company_phone.as_deref())
        .bind(supplier.email.as_deref())
        .bind(supplier.address.as_deref())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!(supplier_id = created.id, name = %created.name, "Supplier created");
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as("SELECT * FROM suppliers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(supplier)
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as("SELECT * FROM suppliers ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(suppliers)
    }

    /// Substring match on name, company name and company phone.
    pub async fn search(&self, term: &str) -> DbResult<Vec<Supplier>> {
        let term = validate_search_query(term)?;

        let suppliers = sqlx::query_as(
            r#"
            SELECT * FROM suppliers
            WHERE name LIKE ?1 ESCAPE '\'
               OR company_name LIKE ?1 ESCAPE '\'
               OR company_phone LIKE ?1 ESCAPE '\'
            ORDER BY name
            "#,
        )
        .bind(like_pattern(&term))
        .fetch_all(&self.pool)
        .await?;
        Ok(suppliers)
    }

    pub async fn update(&self, id: i64, supplier: &NewSupplier) -> DbResult<Supplier> {
        validate_new_supplier(supplier)?;

        let updated: Option<Supplier> = sqlx::query_as(
            r#"
            UPDATE suppliers
            SET name = ?2,
                company_name = ?3,
                company_phone = ?4,
                email = ?5,
                address = ?6,
                updated_at = ?7
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(supplier.name.trim())
        .bind(supplier.company_name.as_deref())
        .bind(supplier.company_phone.as_deref())
        .bind(supplier.email.as_deref())
        .bind(supplier.address.as_deref())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| DbError::not_found("Supplier", id))
    }

    /// Deletes a supplier. Their purchases stay, with the supplier cleared.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        info!(supplier_id = id, "Supplier deleted");
        Ok(())
    }

    /// Suppliers ranked by total AFG purchase cost.
    pub async fn top_suppliers(&self, limit: i64) -> DbResult<Vec<SupplierSummary>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                s.id AS supplier_id,
                s.name,
                s.company_name,
                COUNT(p.id) AS purchase_count,
                COALESCE(SUM(p.total_cost_afg), 0) AS total_cost_afg,
                COALESCE(SUM(p.total_cost_usd), 0) AS total_cost_usd,
                COALESCE(SUM(p.remaining_balance), 0) AS outstanding_balance
            FROM suppliers s
            LEFT JOIN purchases p ON p.supplier_id = s.id
            GROUP BY s.id
            ORDER BY total_cost_afg DESC, s.name
            LIMIT ?1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Sum of remaining balances over the supplier's purchases. Negative
    /// when we have overpaid.
    pub async fn outstanding_balance(&self, supplier_id: i64) -> DbResult<Money> {
        let balance: Money =
            sqlx::query_scalar("SELECT COALESCE(SUM(remaining_balance), 0) FROM purchases WHERE supplier_id = ?1")
                .bind(supplier_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::memory_db;
    use inventory_core::{DualAmount, NewPurchase, PaymentType};

    fn supplier(name: &str) -> NewSupplier {
        NewSupplier {
            name: name.to_string(),
            company_name: Some(format!("{} Trading Co.", name)),
            company_phone: Some("0202101010".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let db = memory_db().await;
        let repo = db.suppliers();

        let created = repo.create(&supplier("Herat Mobile")).await.unwrap();
        assert_eq!(repo.get_by_id(created.id).await.unwrap().unwrap().name, "Herat Mobile");

        let updated = repo.update(created.id, &supplier("Herat Mobiles")).await.unwrap();
        assert_eq!(updated.name, "Herat Mobiles");

        assert_eq!(repo.search("trading").await.unwrap().len(), 1);
        assert_eq!(repo.list().await.unwrap().len(), 1);

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert_eq!(repo.delete(created.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rejects_bad_email() {
        let db = memory_db().await;
        let err = db
            .suppliers()
            .create(&NewSupplier {
                email: Some("not-an-email".to_string()),
                ..supplier("X")
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_balances_and_ranking() {
        let db = memory_db().await;
        let big = db.suppliers().create(&supplier("Big")).await.unwrap().id;
        let small = db.suppliers().create(&supplier("Small")).await.unwrap().id;

        for (supplier_id, total, paid) in [(big, 100_000, 40_000), (big, 50_000, 50_000), (small, 10_000, 0)] {
            db.ledger()
                .create_purchase(&NewPurchase {
                    product_name: Some("Cables".to_string()),
                    supplier_id: Some(supplier_id),
                    quantity: 1,
                    total_cost: DualAmount::new(total, 0),
                    payment_type: PaymentType::Partial,
                    amount_paid: Money::from_minor(paid),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        assert_eq!(
            db.suppliers().outstanding_balance(big).await.unwrap(),
            Money::from_minor(60_000)
        );
        assert_eq!(db.suppliers().outstanding_balance(999).await.unwrap(), Money::zero());

        let top = db.suppliers().top_suppliers(5).await.unwrap();
        assert_eq!(top[0].supplier_id, big);
        assert_eq!(top[0].purchase_count, 2);
        assert_eq!(top[0].total_cost_afg, Money::from_minor(150_000));
        assert_eq!(top[1].supplier_id, small);
    }
}

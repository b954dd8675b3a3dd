//! # Customer Repository
//!
//! Customer lookups, history and profile edits. New customers are created by
//! [`Ledger::register_customer`](crate::ledger::Ledger::register_customer)
//! so their number comes from the same transaction as the insert.

use chrono::Utc;
use inventory_core::validation::{validate_new_customer, validate_search_query};
use inventory_core::{Customer, CustomerPurchase, NewCustomer};
use sqlx::SqlitePool;
use tracing::info;

use super::like_pattern;
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as("SELECT * FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    /// First customer registered with this phone number.
    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as("SELECT * FROM customers WHERE phone = ?1 ORDER BY id LIMIT 1")
            .bind(phone.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    pub async fn get_by_number(&self, customer_number: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as("SELECT * FROM customers WHERE customer_number = ?1")
            .bind(customer_number.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    /// All customers, newest first.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as("SELECT * FROM customers ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(customers)
    }

    /// Substring match on first name, last name, phone and customer number.
    pub async fn search(&self, term: &str) -> DbResult<Vec<Customer>> {
        let term = validate_search_query(term)?;

        let customers = sqlx::query_as(
            r#"
            SELECT * FROM customers
            WHERE first_name LIKE ?1 ESCAPE '\'
               OR last_name LIKE ?1 ESCAPE '\'
               OR phone LIKE ?1 ESCAPE '\'
               OR customer_number LIKE ?1 ESCAPE '\'
            ORDER BY first_name
            "#,
        )
        .bind(like_pattern(&term))
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    /// Every line the customer has bought, newest sale first.
    pub async fn purchase_history(&self, customer_id: i64) -> DbResult<Vec<CustomerPurchase>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                s.id AS sale_id,
                s.invoice_number,
                s.sale_date,
                si.product_id,
                si.product_name,
                si.quantity,
                si.total_price_afg,
                si.total_price_usd
            FROM sales s
            JOIN sale_items si ON si.sale_id = s.id
            WHERE s.customer_id = ?1
            ORDER BY s.sale_date DESC, si.id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Edits name and phone. Number and purchase totals are not editable.
    pub async fn update(&self, id: i64, customer: &NewCustomer) -> DbResult<Customer> {
        validate_new_customer(customer)?;

        let updated: Option<Customer> = sqlx::query_as(
            r#"
            UPDATE customers
            SET first_name = ?2,
                last_name = ?3,
                phone = ?4,
                updated_at = ?5
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(customer.first_name.trim())
        .bind(customer.last_name.as_deref())
        .bind(customer.phone.as_deref())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Deletes a customer. Fails with a constraint violation once the
    /// customer has sales on record.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        info!(customer_id = id, "Customer deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{insert_product, memory_db};
    use inventory_core::{Currency, DualAmount, Money, NewSale, SaleLineRequest};

    async fn register(db: &crate::Database, first: &str, phone: &str) -> i64 {
        db.ledger()
            .register_customer(&NewCustomer {
                first_name: first.to_string(),
                last_name: Some("Karimi".to_string()),
                phone: Some(phone.to_string()),
            })
            .await
            .unwrap()
            .customer_id
    }

    #[tokio::test]
    async fn test_lookups() {
        let db = memory_db().await;
        let id = register(&db, "Ahmad", "0700111222").await;
        let repo = db.customers();

        assert_eq!(repo.get_by_phone("0700111222").await.unwrap().unwrap().id, id);
        assert_eq!(repo.get_by_number("CUS000001").await.unwrap().unwrap().id, id);
        assert!(repo.get_by_id(999).await.unwrap().is_none());
        assert!(repo.get_by_phone("0799").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search() {
        let db = memory_db().await;
        register(&db, "Ahmad", "0700111222").await;
        register(&db, "Zahra", "0788999000").await;
        let repo = db.customers();

        assert_eq!(repo.search("ahm").await.unwrap().len(), 1);
        assert_eq!(repo.search("karimi").await.unwrap().len(), 2);
        assert_eq!(repo.search("CUS000002").await.unwrap()[0].first_name, "Zahra");
        assert!(repo.search("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purchase_history_and_delete_guard() {
        let db = memory_db().await;
        let customer = register(&db, "Ahmad", "0700111222").await;
        let product = insert_product(&db, "Earbuds", 5).await;

        db.ledger()
            .create_sale(&NewSale {
                customer_id: Some(customer),
                lines: vec![SaleLineRequest {
                    product_id: product,
                    product_name: None,
                    quantity: 2,
                    unit_price: DualAmount::new(10_000, 150),
                    warranty: None,
                }],
                discount: Money::zero(),
                currency: Currency::Afg,
                sold_by: None,
            })
            .await
            .unwrap();

        let history = db.customers().purchase_history(customer).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].quantity, 2);
        assert_eq!(history[0].total_price_afg, Money::from_minor(20_000));

        let err = db.customers().delete(customer).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[tokio::test]
    async fn test_update() {
        let db = memory_db().await;
        let id = register(&db, "Ahmad", "0700111222").await;

        let updated = db
            .customers()
            .update(
                id,
                &NewCustomer {
                    first_name: "Ahmad Shah".to_string(),
                    last_name: None,
                    phone: Some("0700000000".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Ahmad Shah");
        assert_eq!(updated.customer_number, "CUS000001");

        let err = db
            .customers()
            .update(999, &NewCustomer {
                first_name: "x".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

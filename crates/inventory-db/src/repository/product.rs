//! # Product Repository
//!
//! Catalogue queries and product CRUD.
//!
//! ## Accessories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products                        product_accessories                    │
//! │  ┌────┬──────────────┐           ┌────────────┬──────────┬────────────┐ │
//! │  │ id │ name         │           │ product_id │ position │ descriptor │ │
//! │  ├────┼──────────────┤           ├────────────┼──────────┼────────────┤ │
//! │  │  7 │ Galaxy A15   │ ◄──────── │          7 │        0 │ charger    │ │
//! │  └────┴──────────────┘           │          7 │        1 │ case       │ │
//! │                                  └────────────┴──────────┴────────────┘ │
//! │                                                                         │
//! │  Product { id: 7, accessories: ["charger", "case"], .. }                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Create and update rewrite the child rows in the same transaction as the
//! product row. Every product returned by this repository carries its
//! accessories in position order.
//!
//! Stock levels are only edited here through a full product update; day to
//! day movements belong to [`crate::stock`] and the ledger.

use std::collections::HashMap;

use chrono::Utc;
use inventory_core::validation::{validate_id, validate_new_product, validate_search_query};
use inventory_core::{NewProduct, Product, ProductSales, ProductStats};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::like_pattern;
use crate::error::{DbError, DbResult};
use crate::ledger::finish;

/// Bound-parameter budget per `IN (...)` lookup.
const ACCESSORY_CHUNK: usize = 500;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let results = repo.search("galaxy").await?;
/// let product = repo.get_by_barcode("8806095048192").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        self.with_accessories(product).await
    }

    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE barcode = ?1")
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;

        self.with_accessories(product).await
    }

    /// All products, newest first.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as("SELECT * FROM products ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;

        self.attach_accessories(products).await
    }

    /// Substring match on name, brand, model and barcode.
    ///
    /// An empty term matches every product.
    pub async fn search(&self, term: &str) -> DbResult<Vec<Product>> {
        let term = validate_search_query(term)?;
        debug!(term = %term, "Searching products");

        let products: Vec<Product> = sqlx::query_as(
            r#"
            SELECT * FROM products
            WHERE name LIKE ?1 ESCAPE '\'
               OR brand LIKE ?1 ESCAPE '\'
               OR model LIKE ?1 ESCAPE '\'
               OR barcode LIKE ?1 ESCAPE '\'
            ORDER BY name
            "#,
        )
        .bind(like_pattern(&term))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        self.attach_accessories(products).await
    }

    pub async fn by_category(&self, category: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as("SELECT * FROM products WHERE category = ?1 ORDER BY name")
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        self.attach_accessories(products).await
    }

    /// Products at or below their alert threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as(
            "SELECT * FROM products WHERE stock_quantity <= min_stock_alert ORDER BY stock_quantity, name",
        )
        .fetch_all(&self.pool)
        .await?;

        self.attach_accessories(products).await
    }

    /// Products with nothing on hand (negative counts included).
    pub async fn out_of_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as("SELECT * FROM products WHERE stock_quantity <= 0 ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        self.attach_accessories(products).await
    }

    /// Best sellers by units sold. Products never sold rank last with 0.
    pub async fn most_sold(&self, limit: i64) -> DbResult<Vec<ProductSales>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                p.id AS product_id,
                p.name,
                p.brand,
                p.model,
                p.stock_quantity,
                COALESCE(SUM(si.quantity), 0) AS total_sold
            FROM products p
            LEFT JOIN sale_items si ON si.product_id = p.id
            GROUP BY p.id
            ORDER BY total_sold DESC, p.name
            LIMIT ?1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn stats(&self) -> DbResult<ProductStats> {
        let stats = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_products,
                COALESCE(SUM(CASE WHEN stock_quantity > 0 THEN 1 ELSE 0 END), 0) AS in_stock,
                COALESCE(SUM(CASE WHEN stock_quantity <= 0 THEN 1 ELSE 0 END), 0) AS out_of_stock,
                COALESCE(SUM(CASE WHEN stock_quantity <= min_stock_alert THEN 1 ELSE 0 END), 0) AS low_stock
            FROM products
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts a product together with its accessories.
    pub async fn create(&self, product: &NewProduct) -> DbResult<Product> {
        validate_new_product(product)?;

        let mut tx = self.pool.begin().await?;
        let result = insert_product(&mut tx, product).await;
        let created = finish(tx, result, "create_product").await?;

        info!(product_id = created.id, name = %created.name, "Product created");
        Ok(created)
    }

    /// Replaces every editable field, accessories included.
    pub async fn update(&self, id: i64, product: &NewProduct) -> DbResult<Product> {
        validate_id("id", id)?;
        validate_new_product(product)?;

        let mut tx = self.pool.begin().await?;
        let result = replace_product(&mut tx, id, product).await;
        let updated = finish(tx, result, "update_product").await?;

        info!(product_id = id, "Product updated");
        Ok(updated)
    }

    /// Deletes a product.
    ///
    /// Fails with a constraint violation while sale lines or returns still
    /// reference it; purchases keep their row with the product cleared.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(product_id = id, "Product deleted");
        Ok(())
    }

    // =========================================================================
    // Accessory Loading
    // =========================================================================

    async fn with_accessories(&self, product: Option<Product>) -> DbResult<Option<Product>> {
        match product {
            Some(product) => Ok(self.attach_accessories(vec![product]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn attach_accessories(&self, mut products: Vec<Product>) -> DbResult<Vec<Product>> {
        if products.is_empty() {
            return Ok(products);
        }

        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let mut by_product: HashMap<i64, Vec<String>> = HashMap::new();

        for chunk in ids.chunks(ACCESSORY_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT product_id, descriptor FROM product_accessories WHERE product_id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(") ORDER BY product_id, position");

            let rows: Vec<(i64, String)> = builder.build_query_as().fetch_all(&self.pool).await?;
            for (product_id, descriptor) in rows {
                by_product.entry(product_id).or_default().push(descriptor);
            }
        }

        for product in &mut products {
            product.accessories = by_product.remove(&product.id).unwrap_or_default();
        }
        Ok(products)
    }
}

// =============================================================================
// Transaction Bodies
// =============================================================================

async fn insert_product(conn: &mut SqliteConnection, product: &NewProduct) -> DbResult<Product> {
    let now = Utc::now();

    let mut created: Product = sqlx::query_as(
        r#"
        INSERT INTO products (
            name, brand, model, barcode, category,
            stock_quantity, min_stock_alert, cost_price,
            selling_price_afg, selling_price_usd,
            photo, created_by, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
        RETURNING *
        "#,
    )
    .bind(product.name.trim())
    .bind(product.brand.as_deref())
    .bind(product.model.as_deref())
    .bind(normalized_barcode(product))
    .bind(product.category.as_deref())
    .bind(product.stock_quantity)
    .bind(product.min_stock_alert)
    .bind(product.cost_price)
    .bind(product.selling_price_afg)
    .bind(product.selling_price_usd)
    .bind(product.photo.as_deref())
    .bind(product.created_by)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    created.accessories = write_accessories(conn, created.id, &product.accessories).await?;
    Ok(created)
}

async fn replace_product(conn: &mut SqliteConnection, id: i64, product: &NewProduct) -> DbResult<Product> {
    let updated: Option<Product> = sqlx::query_as(
        r#"
        UPDATE products
        SET name = ?2,
            brand = ?3,
            model = ?4,
            barcode = ?5,
            category = ?6,
            stock_quantity = ?7,
            min_stock_alert = ?8,
            cost_price = ?9,
            selling_price_afg = ?10,
            selling_price_usd = ?11,
            photo = ?12,
            updated_at = ?13
        WHERE id = ?1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(product.name.trim())
    .bind(product.brand.as_deref())
    .bind(product.model.as_deref())
    .bind(normalized_barcode(product))
    .bind(product.category.as_deref())
    .bind(product.stock_quantity)
    .bind(product.min_stock_alert)
    .bind(product.cost_price)
    .bind(product.selling_price_afg)
    .bind(product.selling_price_usd)
    .bind(product.photo.as_deref())
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    let mut updated = updated.ok_or_else(|| DbError::not_found("Product", id))?;

    sqlx::query("DELETE FROM product_accessories WHERE product_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    updated.accessories = write_accessories(conn, id, &product.accessories).await?;

    Ok(updated)
}

async fn write_accessories(
    conn: &mut SqliteConnection,
    product_id: i64,
    accessories: &[String],
) -> DbResult<Vec<String>> {
    let descriptors: Vec<&str> = accessories.iter().map(|a| a.trim()).collect();
    if descriptors.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO product_accessories (product_id, position, descriptor) ");
    builder.push_values(descriptors.iter().enumerate(), |mut row, (position, descriptor)| {
        row.push_bind(product_id)
            .push_bind(position as i64)
            .push_bind(*descriptor);
    });
    builder.build().execute(&mut *conn).await?;

    Ok(descriptors.into_iter().map(str::to_string).collect())
}

/// Blank barcodes are stored as NULL so they don't collide on UNIQUE.
fn normalized_barcode(product: &NewProduct) -> Option<&str> {
    product
        .barcode
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{insert_product, memory_db};
    use inventory_core::Money;

    fn phone(name: &str, barcode: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            brand: Some("Samsung".to_string()),
            barcode: Some(barcode.to_string()),
            category: Some("Phones".to_string()),
            stock_quantity: 10,
            min_stock_alert: 3,
            selling_price_afg: Money::from_minor(1_500_000),
            accessories: vec!["charger".to_string(), "case".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_with_accessories() {
        let db = memory_db().await;
        let repo = db.products();

        let created = repo.create(&phone("Galaxy A15", "111")).await.unwrap();
        assert_eq!(created.accessories, vec!["charger", "case"]);

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.accessories, vec!["charger", "case"]);

        let by_barcode = repo.get_by_barcode("111").await.unwrap().unwrap();
        assert_eq!(by_barcode.id, created.id);
    }

    #[tokio::test]
    async fn test_update_rewrites_accessories() {
        let db = memory_db().await;
        let repo = db.products();
        let created = repo.create(&phone("Galaxy A15", "111")).await.unwrap();

        let mut changed = phone("Galaxy A15 128GB", "111");
        changed.accessories = vec!["screen guard".to_string()];
        let updated = repo.update(created.id, &changed).await.unwrap();

        assert_eq!(updated.name, "Galaxy A15 128GB");
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.accessories, vec!["screen guard"]);

        let err = repo.update(999, &changed).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_barcode() {
        let db = memory_db().await;
        let repo = db.products();
        repo.create(&phone("A", "111")).await.unwrap();

        let err = repo.create(&phone("B", "111")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[tokio::test]
    async fn test_blank_barcodes_do_not_collide() {
        let db = memory_db().await;
        let repo = db.products();
        repo.create(&phone("A", " ")).await.unwrap();
        repo.create(&phone("B", "")).await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_and_filters() {
        let db = memory_db().await;
        let repo = db.products();
        repo.create(&phone("Galaxy A15", "111")).await.unwrap();
        let empty = insert_product(&db, "iPhone Cable", 0).await;

        assert_eq!(repo.search("galaxy").await.unwrap().len(), 1);
        assert_eq!(repo.search("SAMSUNG").await.unwrap().len(), 1);
        assert_eq!(repo.search("").await.unwrap().len(), 2);
        assert!(repo.search("nothing like this").await.unwrap().is_empty());

        assert_eq!(repo.by_category("Phones").await.unwrap().len(), 1);
        assert!(repo.by_category("Tablets").await.unwrap().is_empty());

        let out = repo.out_of_stock().await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, empty);
        assert_eq!(repo.low_stock().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_input_is_bound() {
        let db = memory_db().await;
        let repo = db.products();
        repo.create(&phone("Galaxy A15", "111")).await.unwrap();

        assert!(repo.search("' OR 1=1 --").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let db = memory_db().await;
        insert_product(&db, "A", 10).await;
        insert_product(&db, "B", 0).await;
        insert_product(&db, "C", 2).await;

        let stats = db.products().stats().await.unwrap();
        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.in_stock, 2);
        assert_eq!(stats.out_of_stock, 1);
        // default alert threshold is 5
        assert_eq!(stats.low_stock, 2);
    }

    #[tokio::test]
    async fn test_most_sold_includes_unsold() {
        let db = memory_db().await;
        insert_product(&db, "A", 10).await;

        let ranking = db.products().most_sold(10).await.unwrap();
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].total_sold, 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = memory_db().await;
        let repo = db.products();
        let created = repo.create(&phone("A", "111")).await.unwrap();

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());

        let err = repo.delete(created.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

//! # Invoice Repository
//!
//! Assembles the data behind a printed invoice.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ INV0000000042            2026-03-14 10:21    │ ◄── sales
//! │ Customer: CUS000007 Ahmad Karimi  0700...    │ ◄── customers (optional)
//! │ Seller:   Farid Ahmadi                       │ ◄── users (optional)
//! ├──────────────────────────────────────────────┤
//! │ Galaxy A15  Samsung  Phones   x1   15,000.00 │ ◄── sale_items + products
//! │   warranty 12 months                         │
//! ├──────────────────────────────────────────────┤
//! │ Total / Discount / Final (AFG + USD)         │ ◄── sales
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Only the data is produced here; layout and printing happen in the UI.

use inventory_core::{InvoiceLine, InvoiceView, Sale};
use sqlx::SqlitePool;

use crate::error::DbResult;

const INVOICE_HEADER: &str = r#"
    SELECT
        s.*,
        c.customer_number,
        TRIM(c.first_name || ' ' || COALESCE(c.last_name, '')) AS customer_name,
        c.phone AS customer_phone,
        TRIM(u.first_name || ' ' || COALESCE(u.last_name, '')) AS seller_name
    FROM sales s
    LEFT JOIN customers c ON c.id = s.customer_id
    LEFT JOIN users u ON u.id = s.sold_by
"#;

#[derive(sqlx::FromRow)]
struct InvoiceHeader {
    #[sqlx(flatten)]
    sale: Sale,
    customer_number: Option<String>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    seller_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn invoice_by_sale_id(&self, sale_id: i64) -> DbResult<Option<InvoiceView>> {
        let sql = format!("{INVOICE_HEADER} WHERE s.id = ?1");
        let header: Option<InvoiceHeader> = sqlx::query_as(&sql)
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;

        self.assemble(header).await
    }

    pub async fn invoice_by_number(&self, invoice_number: &str) -> DbResult<Option<InvoiceView>> {
        let sql = format!("{INVOICE_HEADER} WHERE s.invoice_number = ?1");
        let header: Option<InvoiceHeader> = sqlx::query_as(&sql)
            .bind(invoice_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        self.assemble(header).await
    }

    async fn assemble(&self, header: Option<InvoiceHeader>) -> DbResult<Option<InvoiceView>> {
        let Some(header) = header else {
            return Ok(None);
        };

        let items: Vec<InvoiceLine> = sqlx::query_as(
            r#"
            SELECT
                si.*,
                p.brand,
                p.category,
                p.barcode
            FROM sale_items si
            LEFT JOIN products p ON p.id = si.product_id
            WHERE si.sale_id = ?1
            ORDER BY si.id
            "#,
        )
        .bind(header.sale.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(InvoiceView {
            sale: header.sale,
            customer_number: header.customer_number,
            customer_name: header.customer_name,
            customer_phone: header.customer_phone,
            seller_name: header.seller_name,
            items,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::memory_db;
    use inventory_core::{
        Currency, DualAmount, Money, NewCustomer, NewProduct, NewSale, NewUser, SaleLineRequest, Warranty,
    };

    #[tokio::test]
    async fn test_invoice_joins_names_and_catalogue() {
        let db = memory_db().await;
        let seller = db
            .users()
            .create(&NewUser {
                first_name: "Farid".to_string(),
                last_name: Some("Ahmadi".to_string()),
                email: "farid@shop.af".to_string(),
                password_hash: "hash".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let customer = db
            .ledger()
            .register_customer(&NewCustomer {
                first_name: "Ahmad".to_string(),
                last_name: Some("Karimi".to_string()),
                phone: Some("0700111222".to_string()),
            })
            .await
            .unwrap();
        let product = db
            .products()
            .create(&NewProduct {
                name: "Galaxy A15".to_string(),
                brand: Some("Samsung".to_string()),
                category: Some("Phones".to_string()),
                barcode: Some("8806".to_string()),
                stock_quantity: 4,
                ..Default::default()
            })
            .await
            .unwrap();

        let receipt = db
            .ledger()
            .create_sale(&NewSale {
                customer_id: Some(customer.customer_id),
                lines: vec![SaleLineRequest {
                    product_id: product.id,
                    product_name: None,
                    quantity: 1,
                    unit_price: DualAmount::new(1_500_000, 20_000),
                    warranty: Some(Warranty {
                        value: 12,
                        unit: "months".to_string(),
                    }),
                }],
                discount: Money::from_minor(50_000),
                currency: Currency::Afg,
                sold_by: Some(seller.id),
            })
            .await
            .unwrap();

        let invoice = db
            .invoices()
            .invoice_by_number(&receipt.invoice_number)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(invoice.customer_number.as_deref(), Some("CUS000001"));
        assert_eq!(invoice.customer_name.as_deref(), Some("Ahmad Karimi"));
        assert_eq!(invoice.seller_name.as_deref(), Some("Farid Ahmadi"));
        assert_eq!(invoice.sale.final_amount_afg, Money::from_minor(1_450_000));
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.items[0].brand.as_deref(), Some("Samsung"));
        assert_eq!(invoice.items[0].item.warranty_unit.as_deref(), Some("months"));

        let same = db.invoices().invoice_by_sale_id(receipt.sale_id).await.unwrap().unwrap();
        assert_eq!(same, invoice);
    }

    #[tokio::test]
    async fn test_missing_invoice() {
        let db = memory_db().await;
        assert!(db.invoices().invoice_by_sale_id(1).await.unwrap().is_none());
        assert!(db.invoices().invoice_by_number("INV404").await.unwrap().is_none());
    }
}

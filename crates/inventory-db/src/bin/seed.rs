//! # Seed Data Generator
//!
//! Populates a ledger database with demo data for development.
//!
//! ## Usage
//! ```bash
//! # 200 products (default) plus suppliers, customers, purchases and sales
//! cargo run -p inventory-db --bin seed
//!
//! # Custom amount
//! cargo run -p inventory-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p inventory-db --bin seed -- --db ./data/inventory.db
//! ```
//!
//! Everything is written through the ledger, so stock levels, supplier
//! balances and customer aggregates are consistent with the documents.

use inventory_core::{
    Currency, DualAmount, Money, NewCustomer, NewProduct, NewPurchase, NewSale, NewSupplier, PaymentType,
    SaleLineRequest, Warranty, DEFAULT_MIN_STOCK_ALERT,
};
use inventory_db::{Database, DbConfig};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Catalogue: (category, brand, models, accessories).
const CATALOGUE: &[(&str, &str, &[&str], &[&str])] = &[
    (
        "Phones",
        "Samsung",
        &["Galaxy A05", "Galaxy A15", "Galaxy A25", "Galaxy S23", "Galaxy S24"],
        &["charger", "cable", "case"],
    ),
    (
        "Phones",
        "Xiaomi",
        &["Redmi 13C", "Redmi Note 13", "Poco X6", "Xiaomi 14"],
        &["charger", "cable"],
    ),
    ("Phones", "Apple", &["iPhone 13", "iPhone 14", "iPhone 15"], &["cable"]),
    (
        "Accessories",
        "Anker",
        &["PowerCore 10000", "PowerCore 20000", "Nano Charger", "USB-C Cable"],
        &[],
    ),
    (
        "Accessories",
        "Baseus",
        &["Car Charger", "Magnetic Mount", "Earbuds E3", "Type-C Hub"],
        &["pouch"],
    ),
    (
        "Tablets",
        "Lenovo",
        &["Tab M10", "Tab P11", "Tab M11"],
        &["charger", "stylus"],
    ),
];

const SUPPLIERS: &[(&str, &str, &str)] = &[
    ("Ahmad Noori", "Kabul Mobile Wholesale", "Kabul"),
    ("Sayed Rahimi", "Herat Electronics", "Herat"),
    ("Mohammad Jan", "Mazar Digital Trading", "Mazar-i-Sharif"),
];

const FIRST_NAMES: &[&str] = &[
    "Ahmad", "Farid", "Zahra", "Omid", "Maryam", "Nasir", "Shabnam", "Wahid", "Laila", "Karim",
];

const LAST_NAMES: &[&str] = &["Karimi", "Ahmadi", "Noori", "Hashimi", "Sultani", "Rahimi"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./inventory_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Inventory Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./inventory_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db = %db_path, products = count, "Seeding ledger");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().stats().await?.total_products;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Suppliers
    let mut supplier_ids = Vec::with_capacity(SUPPLIERS.len());
    for (name, company, address) in SUPPLIERS {
        let supplier = db
            .suppliers()
            .create(&NewSupplier {
                name: name.to_string(),
                company_name: Some(company.to_string()),
                company_phone: None,
                email: None,
                address: Some(address.to_string()),
            })
            .await?;
        supplier_ids.push(supplier.id);
    }

    // Products, each stocked by a purchase
    let mut product_ids = Vec::with_capacity(count);
    'catalogue: for round in 0.. {
        let before = product_ids.len();
        for (category, brand, models, accessories) in CATALOGUE {
            for model in models.iter() {
                if product_ids.len() >= count {
                    break 'catalogue;
                }
                let seed = product_ids.len();
                let name = if round == 0 {
                    model.to_string()
                } else {
                    format!("{model} ({})", round + 1)
                };

                let product = generate_product(category, brand, &name, accessories, seed);
                let cost = product.cost_price;
                let created = match db.products().create(&product).await {
                    Ok(created) => created,
                    Err(err) => {
                        warn!(name = %name, error = %err, "Failed to insert product");
                        continue;
                    }
                };

                let quantity = 5 + (seed % 20) as i64;
                let total = Money::from_minor(cost.minor() * quantity);
                let (payment_type, paid) = match seed % 3 {
                    0 => (PaymentType::Cash, total),
                    1 => (PaymentType::Credit, Money::zero()),
                    _ => (PaymentType::Partial, Money::from_minor(total.minor() / 2)),
                };
                db.ledger()
                    .create_purchase(&NewPurchase {
                        product_id: Some(created.id),
                        supplier_id: Some(supplier_ids[seed % supplier_ids.len()]),
                        quantity,
                        unit_cost_price: cost,
                        total_cost: DualAmount::new(total.minor(), total.minor() / 70),
                        payment_type,
                        amount_paid: paid,
                        ..Default::default()
                    })
                    .await?;

                product_ids.push((created.id, product.selling_price_afg, product.selling_price_usd));

                if product_ids.len() % 100 == 0 {
                    info!(generated = product_ids.len(), "Products generated");
                }
            }
        }
        if product_ids.len() == before {
            warn!(round, "No product could be inserted, stopping");
            break;
        }
    }

    // Customers
    let customer_count = (count / 10).max(1);
    let mut customer_ids = Vec::with_capacity(customer_count);
    for n in 0..customer_count {
        let receipt = db
            .ledger()
            .register_customer(&NewCustomer {
                first_name: FIRST_NAMES[n % FIRST_NAMES.len()].to_string(),
                last_name: Some(LAST_NAMES[n % LAST_NAMES.len()].to_string()),
                phone: Some(format!("07{:08}", 10_000_000 + n * 7919)),
            })
            .await?;
        customer_ids.push(receipt.customer_id);
    }

    // Sales, a third of them walk-in
    let mut sales = 0;
    for n in 0..count.min(product_ids.len()) {
        let (product_id, afg, usd) = product_ids[(n * 7) % product_ids.len()];
        let customer_id = (n % 3 != 0).then(|| customer_ids[n % customer_ids.len()]);
        let warranty = (n % 2 == 0).then(|| Warranty {
            value: 6,
            unit: "months".to_string(),
        });

        let result = db
            .ledger()
            .create_sale(&NewSale {
                customer_id,
                lines: vec![SaleLineRequest {
                    product_id,
                    product_name: None,
                    quantity: 1,
                    unit_price: DualAmount::new(afg.minor(), usd.minor()),
                    warranty,
                }],
                discount: Money::zero(),
                currency: if n % 5 == 0 { Currency::Usd } else { Currency::Afg },
                sold_by: None,
            })
            .await;

        match result {
            Ok(_) => sales += 1,
            Err(err) => warn!(product_id, error = %err, "Skipped sale"),
        }
    }

    let stats = db.products().stats().await?;
    info!(
        products = stats.total_products,
        low_stock = stats.low_stock,
        customers = customer_ids.len(),
        sales,
        elapsed = ?start.elapsed(),
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

/// Builds one catalogue entry with deterministic prices.
fn generate_product(category: &str, brand: &str, name: &str, accessories: &[&str], seed: usize) -> NewProduct {
    // 1,500 - 61,500 AFG, in minor units
    let afg = (1_500 + ((seed * 1_237) % 60_000) as i64) * 100;
    let usd = afg / 70;
    let cost = afg * (65 + (seed % 20) as i64) / 100;

    NewProduct {
        name: name.to_string(),
        brand: Some(brand.to_string()),
        model: Some(name.to_string()),
        barcode: Some(format!("880{:010}", seed)),
        category: Some(category.to_string()),
        stock_quantity: 0,
        min_stock_alert: DEFAULT_MIN_STOCK_ALERT,
        cost_price: Money::from_minor(cost),
        selling_price_afg: Money::from_minor(afg),
        selling_price_usd: Money::from_minor(usd),
        accessories: accessories.iter().map(|a| a.to_string()).collect(),
        photo: None,
        created_by: None,
    }
}

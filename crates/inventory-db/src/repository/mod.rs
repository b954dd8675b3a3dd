//! # Repository Module
//!
//! Read-side queries and reference-data CRUD for the inventory ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  IPC handler                                                            │
//! │       │                                                                 │
//! │       │  db.products().search("charger")                                │
//! │       ▼                                                                 │
//! │  ProductRepository                                                      │
//! │  ├── search(&self, term)                                                │
//! │  ├── get_by_id(&self, id)                                               │
//! │  ├── create(&self, product)                                             │
//! │  └── update(&self, id, product)                                         │
//! │       │                                                                 │
//! │       │  SQL, parameters always bound                                   │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  No match is Ok(None) / Ok(vec![]), never an error.                     │
//! │  Documents that move stock or money go through the Ledger instead.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalogue, accessories, stock views
//! - [`CustomerRepository`](customer::CustomerRepository) - Lookup and purchase history
//! - [`SupplierRepository`](supplier::SupplierRepository) - CRUD and balances
//! - [`UserRepository`](user::UserRepository) - Accounts and login log
//! - [`SaleRepository`](sale::SaleRepository) - Sales with items, statistics
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - Purchases, statistics
//! - [`ReturnRepository`](returns::ReturnRepository) - Returns, statistics
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Printable invoice data

use chrono::{DateTime, TimeDelta, Utc};

pub mod customer;
pub mod invoice;
pub mod product;
pub mod purchase;
pub mod returns;
pub mod sale;
pub mod supplier;
pub mod user;

/// `%term%` for a case-insensitive `LIKE ?1 ESCAPE '\'` match.
///
/// Wildcards in the term match themselves.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Start of a trailing statistics window of `days` days.
///
/// A window reaching past the representable range covers all time.
pub(crate) fn window_start(days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days.max(0))
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Midnight UTC of the current day.
pub(crate) fn start_of_today() -> DateTime<Utc> {
    let now = Utc::now();
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("cable"), "%cable%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("usb_c"), "%usb\\_c%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_window_start() {
        let now = Utc::now();
        let week = window_start(7);
        assert!(week <= now - TimeDelta::days(7));
        assert!(week > now - TimeDelta::days(8));

        assert!(window_start(-3) <= Utc::now());
        assert_eq!(window_start(100_000_000), DateTime::<Utc>::MIN_UTC);
        assert_eq!(window_start(i64::MAX), DateTime::<Utc>::MIN_UTC);
    }
}

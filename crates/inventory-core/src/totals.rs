//! # Document Totals
//!
//! Per-line and per-document arithmetic for sales and purchases.
//!
//! ## Sale Totals Flow
//! ```text
//! lines ──► line_total(unit, qty) ──► document_total ──► apply_discount ──► final
//!            afg: 100 × 3 = 300        afg: 300          AFG sale, -50     afg: 250
//!            usd:   1 × 3 =   3        usd:   3          (USD untouched)   usd:   3
//! ```
//!
//! The discount is a single amount in the sale's selected currency. It is
//! taken from that side only; the other side's final amount equals its total.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Currency, DualAmount, Money};

// =============================================================================
// Line and Document Totals
// =============================================================================

/// `unit_price × quantity` on both currency sides.
///
/// No rounding happens here: minor units times an integer stay exact.
pub fn line_total(unit_price: DualAmount, quantity: i64) -> CoreResult<DualAmount> {
    unit_price.checked_mul(quantity)
}

/// Sums line totals per currency.
pub fn document_total(lines: &[DualAmount]) -> CoreResult<DualAmount> {
    lines
        .iter()
        .try_fold(DualAmount::zero(), |acc, line| acc.checked_add(line))
}

// =============================================================================
// Discount
// =============================================================================

/// Applies `discount` to `total` only when the total's `currency` is the
/// sale's `selected` currency.
///
/// ## Example
/// ```rust
/// use inventory_core::money::{Currency, Money};
/// use inventory_core::totals::apply_discount;
///
/// let afg = apply_discount(Money::from_minor(300), Money::from_minor(50), Currency::Afg, Currency::Afg);
/// let usd = apply_discount(Money::from_minor(3), Money::from_minor(50), Currency::Usd, Currency::Afg);
///
/// assert_eq!(afg.minor(), 250);
/// assert_eq!(usd.minor(), 3);
/// ```
pub fn apply_discount(total: Money, discount: Money, currency: Currency, selected: Currency) -> Money {
    if currency == selected {
        total - discount
    } else {
        total
    }
}

/// [`apply_discount`] on both sides of a document total.
pub fn apply_discount_dual(total: DualAmount, discount: Money, selected: Currency) -> DualAmount {
    DualAmount {
        afg: apply_discount(total.afg, discount, Currency::Afg, selected),
        usd: apply_discount(total.usd, discount, Currency::Usd, selected),
    }
}

/// Checks a discount against the total it will be taken from.
pub fn validate_discount(total: DualAmount, discount: Money, selected: Currency) -> CoreResult<()> {
    discount.ensure_non_negative("discount")?;

    let available = total.get(selected);
    if discount > available {
        return Err(ValidationError::ExceedsLimit {
            field: "discount".to_string(),
            value: discount.minor(),
            max: available.minor(),
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Sale Totals
// =============================================================================

/// Header amounts of a sale, derived from its line totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub total_amount: DualAmount,
    pub discount: Money,
    pub currency: Currency,
    pub final_amount: DualAmount,
}

impl SaleTotals {
    /// Computes totals and final amounts from already computed line totals.
    ///
    /// ## Errors
    /// - `Validation` when the discount is negative or larger than the
    ///   selected-currency total
    /// - `AmountOverflow` when the sum leaves the `i64` range
    pub fn compute(line_totals: &[DualAmount], discount: Money, currency: Currency) -> CoreResult<Self> {
        let total_amount = document_total(line_totals)?;
        validate_discount(total_amount, discount, currency)?;

        Ok(SaleTotals {
            total_amount,
            discount,
            currency,
            final_amount: apply_discount_dual(total_amount, discount, currency),
        })
    }
}

// =============================================================================
// Purchase Balance
// =============================================================================

/// Amount still owed to the supplier.
///
/// Negative when the store paid more than the AFG cost (a credit with the
/// supplier).
pub fn remaining_balance(total_cost_afg: Money, amount_paid: Money) -> CoreResult<Money> {
    total_cost_afg
        .checked_sub(amount_paid)
        .ok_or_else(|| CoreError::overflow("remaining balance"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_is_exact_product() {
        let line = line_total(DualAmount::new(100, 1), 3).unwrap();
        assert_eq!(line, DualAmount::new(300, 3));
    }

    #[test]
    fn test_document_total_sums_each_side() {
        let lines = [DualAmount::new(300, 3), DualAmount::new(1250, 15)];
        assert_eq!(document_total(&lines).unwrap(), DualAmount::new(1550, 18));
        assert_eq!(document_total(&[]).unwrap(), DualAmount::zero());
    }

    #[test]
    fn test_discount_only_hits_selected_currency() {
        let total = DualAmount::new(300, 3);

        let afg_sale = apply_discount_dual(total, Money::from_minor(50), Currency::Afg);
        assert_eq!(afg_sale, DualAmount::new(250, 3));

        let usd_sale = apply_discount_dual(total, Money::from_minor(2), Currency::Usd);
        assert_eq!(usd_sale, DualAmount::new(300, 1));
    }

    #[test]
    fn test_sale_totals_without_discount() {
        let totals = SaleTotals::compute(&[DualAmount::new(300, 3)], Money::zero(), Currency::Afg).unwrap();
        assert_eq!(totals.total_amount, DualAmount::new(300, 3));
        assert_eq!(totals.final_amount, DualAmount::new(300, 3));
    }

    #[test]
    fn test_discount_larger_than_total_rejected() {
        let err = SaleTotals::compute(&[DualAmount::new(300, 3)], Money::from_minor(5), Currency::Usd)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::ExceedsLimit { max: 3, .. })
        ));
    }

    #[test]
    fn test_negative_discount_rejected() {
        let err = validate_discount(DualAmount::new(10, 10), Money::from_minor(-1), Currency::Afg)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_overflow_reported() {
        assert!(line_total(DualAmount::new(i64::MAX / 2, 0), 3).is_err());
        let lines = [DualAmount::new(i64::MAX, 0), DualAmount::new(1, 0)];
        assert!(matches!(
            document_total(&lines),
            Err(CoreError::AmountOverflow { .. })
        ));
    }

    #[test]
    fn test_remaining_balance() {
        let owed = remaining_balance(Money::from_minor(1000), Money::from_minor(400)).unwrap();
        assert_eq!(owed.minor(), 600);

        let credit = remaining_balance(Money::from_minor(1000), Money::from_minor(1200)).unwrap();
        assert_eq!(credit.minor(), -200);
    }
}

//! # Money Module
//!
//! Provides `Money`, `Currency` and `DualAmount`, the value types every
//! price, total, discount and refund in the ledger flows through.
//!
//! ## Two Parallel Currencies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The store prices every product in BOTH afghani and dollars.            │
//! │                                                                         │
//! │  Product.selling_price ──► DualAmount { afg: 100, usd: 1 }              │
//! │                                  │                                      │
//! │                         × quantity (per currency)                       │
//! │                                  ▼                                      │
//! │  SaleItem.total_price  ──► DualAmount { afg: 300, usd: 3 }              │
//! │                                                                         │
//! │  The two sides are never converted into each other. A sale records      │
//! │  both totals; the customer's selected currency only decides which side  │
//! │  the discount is taken from.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Integer Minor Units
//! Amounts are `i64` in the smallest unit of their currency. There is no
//! floating point anywhere on the write path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest unit of its currency.
///
/// `Money` carries no currency of its own; the column or field it lives in
/// decides that (`total_amount_afg`, `refund_amount_usd`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use inventory_core::money::Money;
    ///
    /// let price = Money::from_minor(1099);
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Addition that reports overflow instead of wrapping.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Subtraction that reports overflow instead of wrapping.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Multiplies by a quantity, reporting overflow.
    ///
    /// ## Example
    /// ```rust
    /// use inventory_core::money::Money;
    ///
    /// let unit = Money::from_minor(299);
    /// assert_eq!(unit.checked_mul(3), Some(Money::from_minor(897)));
    /// assert_eq!(Money::from_minor(i64::MAX).checked_mul(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul(self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Checks that the amount is not negative, naming the field on failure.
    pub fn ensure_non_negative(self, field: &str) -> Result<Money, ValidationError> {
        if self.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: field.to_string(),
            });
        }
        Ok(self)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount as major units with two decimals (`12.50`).
///
/// Formatting with currency symbols belongs to the renderer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl From<i64> for Money {
    fn from(minor: i64) -> Self {
        Money(minor)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Currency
// =============================================================================

/// The two currencies the store trades in.
///
/// Stored and serialized as the ISO code (`"AFG"`, `"USD"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Currency {
    /// Afghan afghani.
    #[default]
    Afg,
    /// US dollar.
    Usd,
}

impl Currency {
    /// The ISO-style code used in storage.
    pub const fn code(&self) -> &'static str {
        match self {
            Currency::Afg => "AFG",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AFG" | "AFN" => Ok(Currency::Afg),
            "USD" => Ok(Currency::Usd),
            other => Err(ValidationError::InvalidFormat {
                field: "currency".to_string(),
                reason: format!("unknown currency '{}', expected AFG or USD", other),
            }),
        }
    }
}

// =============================================================================
// Dual Amount
// =============================================================================

/// A pair of amounts, one per currency, that always travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DualAmount {
    pub afg: Money,
    pub usd: Money,
}

impl DualAmount {
    /// Creates a pair from raw minor units.
    #[inline]
    pub const fn new(afg: i64, usd: i64) -> Self {
        DualAmount {
            afg: Money::from_minor(afg),
            usd: Money::from_minor(usd),
        }
    }

    /// Both sides zero.
    #[inline]
    pub const fn zero() -> Self {
        DualAmount::new(0, 0)
    }

    /// Returns the side for `currency`.
    #[inline]
    pub const fn get(&self, currency: Currency) -> Money {
        match currency {
            Currency::Afg => self.afg,
            Currency::Usd => self.usd,
        }
    }

    /// Multiplies both sides by `qty`.
    pub fn checked_mul(&self, qty: i64) -> CoreResult<DualAmount> {
        Ok(DualAmount {
            afg: self
                .afg
                .checked_mul(qty)
                .ok_or_else(|| CoreError::overflow("AFG amount × quantity"))?,
            usd: self
                .usd
                .checked_mul(qty)
                .ok_or_else(|| CoreError::overflow("USD amount × quantity"))?,
        })
    }

    /// Adds both sides.
    pub fn checked_add(&self, other: &DualAmount) -> CoreResult<DualAmount> {
        Ok(DualAmount {
            afg: self
                .afg
                .checked_add(other.afg)
                .ok_or_else(|| CoreError::overflow("AFG sum"))?,
            usd: self
                .usd
                .checked_add(other.usd)
                .ok_or_else(|| CoreError::overflow("USD sum"))?,
        })
    }

    /// Rejects negative amounts on either side.
    pub fn ensure_non_negative(&self, field: &str) -> Result<(), ValidationError> {
        self.afg.ensure_non_negative(&format!("{}_afg", field))?;
        self.usd.ensure_non_negative(&format!("{}_usd", field))?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

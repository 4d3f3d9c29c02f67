//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(10,2)` in `PostgreSQL` and travel over the
//! wire as decimal strings (`"19.99"`), never as binary floating point.
//! All arithmetic is checked so a pathological order total surfaces as an
//! error instead of wrapping.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Quantity;

/// Errors that can occur when constructing or combining a [`Price`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    /// Amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// Amount has more fractional digits than the currency supports.
    #[error("price must have at most {max} decimal places")]
    TooPrecise {
        /// Maximum allowed decimal places.
        max: u32,
    },
    /// Arithmetic overflowed the decimal range.
    #[error("price arithmetic overflowed")]
    Overflow,
}

/// A non-negative monetary amount in the store currency.
///
/// ## Constraints
///
/// - Never negative
/// - At most two decimal places (minor units)
///
/// ## Examples
///
/// ```
/// use bookshelf_core::{Price, Quantity};
/// use rust_decimal::Decimal;
///
/// let unit = Price::from_cents(1000).unwrap();
/// let line = unit.times(Quantity::new(2).unwrap()).unwrap();
/// assert_eq!(line.amount(), Decimal::new(2000, 2));
/// assert_eq!(line.to_string(), "20.00");
///
/// assert!(Price::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Number of decimal places the store currency uses.
    pub const SCALE: u32 = 2;

    /// A zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for amounts below zero and
    /// `PriceError::TooPrecise` for amounts with sub-cent digits.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        // `normalize` drops trailing zeros so "10.000" is still accepted.
        if amount.normalize().scale() > Self::SCALE {
            return Err(PriceError::TooPrecise { max: Self::SCALE });
        }
        Ok(Self(amount))
    }

    /// Create a price from an integer number of minor units (cents).
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `cents` is negative.
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(cents, Self::SCALE))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the product does not fit a `Decimal`.
    pub fn times(self, quantity: Quantity) -> Result<Self, PriceError> {
        self.0
            .checked_mul(Decimal::from(quantity.get()))
            .map(Self)
            .ok_or(PriceError::Overflow)
    }

    /// Sum of two prices.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the sum does not fit a `Decimal`.
    pub fn checked_add(self, other: Self) -> Result<Self, PriceError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(PriceError::Overflow)
    }

    /// Sum an iterator of prices.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the running total overflows.
    pub fn total<I>(prices: I) -> Result<Self, PriceError>
    where
        I: IntoIterator<Item = Self>,
    {
        prices
            .into_iter()
            .try_fold(Self::ZERO, |acc, price| acc.checked_add(price))
    }

    /// Format for display with a currency symbol (e.g. "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("${self}")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

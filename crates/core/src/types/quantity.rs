//! Strictly positive item quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantity was zero or negative.
    #[error("quantity must be at least 1 (got {0})")]
    NotPositive(i64),
}

/// Number of units of a book on a cart line or order line.
///
/// Always at least 1. Backed by `i32` to match the `INTEGER` columns it is
/// stored in, so conversion to a bind parameter is infallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` if `n < 1`.
    pub fn new(n: i32) -> Result<Self, QuantityError> {
        if n < 1 {
            return Err(QuantityError::NotPositive(i64::from(n)));
        }
        Ok(Self(n))
    }

    /// The quantity as an `i32`.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(n: i32) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<Quantity> for i32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

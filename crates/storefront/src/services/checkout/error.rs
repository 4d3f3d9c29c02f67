//! Checkout error types.

use thiserror::Error;

use bookshelf_core::{BookId, OrderNumberError, PriceError, UserId};

use crate::db::RepositoryError;

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A book does not have enough stock for the requested quantity.
    #[error("insufficient stock for book {book_id}: requested {requested}, available {available}")]
    InsufficientStock {
        book_id: BookId,
        requested: i32,
        available: i32,
    },

    /// The session refers to a user that no longer exists.
    #[error("unknown customer {0}")]
    UnknownCustomer(UserId),

    /// The shipping address could not be stored.
    #[error("failed to save shipping address: {0}")]
    AddressPersist(#[source] RepositoryError),

    /// Any other storage failure, including commit.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// Price arithmetic overflowed.
    #[error("pricing error: {0}")]
    Pricing(#[from] PriceError),

    /// A generated order number was malformed.
    #[error("order number error: {0}")]
    OrderNumber(#[from] OrderNumberError),

    /// Every generated order number collided with an existing one.
    #[error("no unique order number after {attempts} attempts")]
    OrderNumberExhausted { attempts: u32 },

    /// The checkout did not finish before the deadline.
    #[error("checkout timed out")]
    Timeout,
}

impl CheckoutError {
    /// Whether the caller can fix this by changing the request or the cart.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyCart | Self::InsufficientStock { .. } | Self::UnknownCustomer(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(CheckoutError::EmptyCart.is_client_error());
        assert!(
            CheckoutError::InsufficientStock {
                book_id: BookId::new(1),
                requested: 2,
                available: 1,
            }
            .is_client_error()
        );
        assert!(!CheckoutError::Timeout.is_client_error());
        assert!(!CheckoutError::Storage(RepositoryError::NotFound).is_client_error());
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = CheckoutError::InsufficientStock {
            book_id: BookId::new(7),
            requested: 5,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for book 7: requested 5, available 3"
        );
    }
}

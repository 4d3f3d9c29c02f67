//! Order number generation.

use chrono::NaiveDate;
use rand::Rng;
use rand::seq::IndexedRandom;

use bookshelf_core::{OrderNumber, OrderNumberError};

/// Generate a random order number for `date`.
///
/// The token carries 40 bits of randomness; collisions are still possible and
/// are resolved by the `UNIQUE` constraint on `orders.order_number`.
///
/// # Errors
///
/// Returns `OrderNumberError` if the token is rejected, which would mean the
/// alphabet constant and the validator disagree.
pub fn generate<R: Rng + ?Sized>(
    date: NaiveDate,
    rng: &mut R,
) -> Result<OrderNumber, OrderNumberError> {
    let token: String = (0..OrderNumber::TOKEN_LEN)
        .filter_map(|_| OrderNumber::TOKEN_ALPHABET.choose(&mut *rng))
        .map(|&b| char::from(b))
        .collect();
    OrderNumber::new(date, &token)
}

//! Business logic services for the storefront.
//!
//! - `checkout` - Turns a cart into an order inside one transaction

pub mod checkout;

pub use checkout::{CheckoutError, CheckoutRequest, CheckoutService, PlacedOrder};

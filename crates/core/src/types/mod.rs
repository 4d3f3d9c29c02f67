//! Core types for Bookshelf.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod order_number;
pub mod price;
pub mod quantity;
pub mod status;

pub use id::*;
pub use order_number::{OrderNumber, OrderNumberError};
pub use price::{Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use status::*;

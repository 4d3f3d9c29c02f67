//! Domain models for the storefront.
//!
//! Rows are read into private row structs in `db` and converted into these
//! types, so every `Price` and `Quantity` here has already been validated.

pub mod address;
pub mod book;
pub mod cart;
pub mod order;
pub mod session;

pub use address::{Address, ShippingDetails, ShippingDetailsError};
pub use book::{Book, Category};
pub use cart::{CartItem, CartLine, CartView};
pub use order::{Order, OrderDetail, OrderItem};
pub use session::{CurrentUser, keys as session_keys};

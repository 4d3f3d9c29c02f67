//! Bookshelf Core - Shared domain types.
//!
//! This crate provides the types shared by every Bookshelf component:
//! - `storefront` - Catalog, cart and checkout HTTP API
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. Money and quantities are validated at construction so the
//! rest of the workspace never sees a negative price or a zero quantity.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, order numbers and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

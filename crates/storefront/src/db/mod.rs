//! Database operations for the bookstore `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Customers (written by the auth service, read here)
//! - `categories`, `books` - Catalog and stock counters
//! - `cart_items` - One row per (user, book)
//! - `addresses` - Shipping address snapshots owned by orders
//! - `orders`, `order_items` - Placed orders and their lines
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bookshelf-cli -- migrate
//! ```

pub mod books;
pub mod cart;
pub mod checkout;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod orders;

use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bookshelf_core::{Price, Quantity};

pub use books::BookRepository;
pub use cart::CartRepository;
pub use checkout::PgCheckoutStore;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
pub use orders::OrderRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in database is invalid or corrupted.
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("Record not found")]
    NotFound,

    /// Conflict (e.g., a guarded stock update matched no row).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Injected failure (in-memory test store only).
    #[cfg(any(test, feature = "test-support"))]
    #[error("Injected failure: {0}")]
    Injected(&'static str),
}

/// Convert a stored amount, reporting out-of-range values as corruption.
pub(crate) fn to_price(amount: Decimal, column: &str) -> Result<Price, RepositoryError> {
    Price::new(amount)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

/// Convert a stored quantity, reporting non-positive values as corruption.
pub(crate) fn to_quantity(n: i32, column: &str) -> Result<Quantity, RepositoryError> {
    Quantity::new(n)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET  /api/books                  - List books, newest first
//! GET  /api/books/{id}             - Book detail
//! GET  /api/categories             - List categories
//!
//! # Cart (requires auth)
//! GET  /api/cart                   - View cart
//! POST /api/cart/add               - Add a book (quantity defaults to 1)
//! POST /api/cart/update            - Set a line's quantity
//! POST /api/cart/remove            - Remove a line
//!
//! # Checkout (requires auth)
//! POST /api/checkout               - Place an order (optional Idempotency-Key header)
//!
//! # Orders (requires auth)
//! GET  /api/orders                 - Order history
//! GET  /api/orders/{id}            - Order detail
//!
//! # Admin (requires is_admin)
//! PUT  /api/admin/orders/{id}      - Set order status
//! POST /api/admin/books/{id}/stock - Adjust stock by a signed delta
//! ```

pub mod admin;
pub mod books;
pub mod cart;
pub mod checkout;
pub mod orders;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(books::index))
        .route("/books/{id}", get(books::show))
        .route("/categories", get(books::categories))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the order history routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/{id}", put(admin::update_order_status))
        .route("/books/{id}/stock", post(admin::adjust_stock))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api", catalog_routes())
        .nest("/api/cart", cart_routes())
        .route("/api/checkout", post(checkout::place_order))
        .nest("/api/orders", order_routes())
        .nest("/api/admin", admin_routes())
}

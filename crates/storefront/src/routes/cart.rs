//! Cart route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use bookshelf_core::{BookId, Quantity};

use crate::db::{CartRepository, RepositoryError};
use crate::error::{AppError, AppJson, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::CartView;
use crate::state::AppState;

/// Body of `POST /api/cart/add`.
#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub book_id: BookId,
    /// Missing or < 1 means 1.
    #[serde(default)]
    pub quantity: Option<i32>,
}

/// Body of `POST /api/cart/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateCartItem {
    pub book_id: BookId,
    pub quantity: i32,
}

/// Body of `POST /api/cart/remove`.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCart {
    pub book_id: BookId,
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

fn not_in_cart(err: RepositoryError, book_id: BookId) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound(format!("book {book_id} is not in the cart")),
        other => other.into(),
    }
}

/// Show the caller's cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    let cart = CartRepository::new(state.pool()).view(user.id).await?;
    Ok(Json(cart))
}

/// Add a book to the caller's cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<AddToCart>,
) -> Result<Json<Value>> {
    let quantity = body
        .quantity
        .and_then(|n| Quantity::new(n).ok())
        .unwrap_or(Quantity::ONE);

    CartRepository::new(state.pool())
        .add(user.id, body.book_id, quantity)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("book {}", body.book_id)),
            RepositoryError::Conflict(msg) => AppError::BadRequest(msg),
            other => other.into(),
        })?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("book_id", &body.book_id.to_string())]),
    );
    Ok(success())
}

/// Set the quantity of a line in the caller's cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<UpdateCartItem>,
) -> Result<Json<Value>> {
    let quantity = Quantity::new(body.quantity)
        .map_err(|_| AppError::BadRequest("Quantity must be at least 1".to_string()))?;

    CartRepository::new(state.pool())
        .update(user.id, body.book_id, quantity)
        .await
        .map_err(|e| not_in_cart(e, body.book_id))?;
    Ok(success())
}

/// Remove a line from the caller's cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<RemoveFromCart>,
) -> Result<Json<Value>> {
    CartRepository::new(state.pool())
        .remove(user.id, body.book_id)
        .await
        .map_err(|e| not_in_cart(e, body.book_id))?;
    Ok(success())
}

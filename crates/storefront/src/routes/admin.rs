//! Admin route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookshelf_core::{BookId, OrderId, OrderStatus};

use crate::db::{BookRepository, OrderRepository, RepositoryError};
use crate::error::{AppError, AppJson, Result};
use crate::middleware::RequireAdmin;
use crate::models::Order;
use crate::state::AppState;

/// Body of `PUT /api/admin/orders/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
}

/// Body of `POST /api/admin/books/{id}/stock`.
#[derive(Debug, Deserialize)]
pub struct AdjustStock {
    pub delta: i32,
}

/// Stock after an adjustment.
#[derive(Debug, Serialize)]
pub struct StockLevel {
    pub book_id: BookId,
    pub stock_quantity: i32,
}

/// Set an order's status.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, status = %body.status))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    AppJson(body): AppJson<UpdateOrderStatus>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .update_status(id, body.status)
        .await
        .map(Json)
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("order {id}")),
            other => other.into(),
        })
}

/// Add a signed delta to a book's stock.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, delta = body.delta))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<BookId>,
    AppJson(body): AppJson<AdjustStock>,
) -> Result<Json<StockLevel>> {
    let stock_quantity = BookRepository::new(state.pool())
        .adjust_stock(id, body.delta)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("book {id}")),
            RepositoryError::Conflict(msg) => AppError::BadRequest(msg),
            other => other.into(),
        })?;

    Ok(Json(StockLevel {
        book_id: id,
        stock_quantity,
    }))
}

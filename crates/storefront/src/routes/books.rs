//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use bookshelf_core::BookId;

use crate::db::BookRepository;
use crate::error::{AppError, Result};
use crate::models::{Book, Category};
use crate::state::AppState;

/// List all books.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Book>>> {
    let books = BookRepository::new(state.pool()).list().await?;
    Ok(Json(books))
}

/// Show one book.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<BookId>) -> Result<Json<Book>> {
    BookRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("book {id}")))
}

/// List all categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = BookRepository::new(state.pool()).categories().await?;
    Ok(Json(categories))
}

//! Catalog models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookshelf_core::{BookId, CategoryId, Price};

/// A book in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: Price,
    pub stock_quantity: i32,
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub cover_image_url: String,
    pub isbn: String,
    pub publication_year: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// A catalog category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
}

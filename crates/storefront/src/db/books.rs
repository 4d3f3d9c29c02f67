//! Catalog repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bookshelf_core::{BookId, CategoryId};

use super::{RepositoryError, to_price};
use crate::models::{Book, Category};

#[derive(sqlx::FromRow)]
struct BookRow {
    id: BookId,
    title: String,
    author: String,
    description: String,
    price: Decimal,
    stock_quantity: i32,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    cover_image_url: String,
    isbn: String,
    publication_year: Option<i32>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookRow> for Book {
    type Error = RepositoryError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            author: row.author,
            description: row.description,
            price: to_price(row.price, "books.price")?,
            stock_quantity: row.stock_quantity,
            category_id: row.category_id,
            category_name: row.category_name,
            cover_image_url: row.cover_image_url,
            isbn: row.isbn,
            publication_year: row.publication_year,
            created_at: row.created_at,
        })
    }
}

const BOOK_COLUMNS: &str = r"
    SELECT b.id, b.title, b.author, b.description, b.price, b.stock_quantity,
           b.category_id, c.name AS category_name, b.cover_image_url, b.isbn,
           b.publication_year, b.created_at
    FROM books b
    LEFT JOIN categories c ON c.id = b.category_id
";

/// Repository for catalog reads and stock adjustments.
pub struct BookRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookRepository<'a> {
    /// Create a new book repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all books, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Book>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "{BOOK_COLUMNS} ORDER BY b.created_at DESC, b.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Book::try_from).collect()
    }

    /// Get a book by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!("{BOOK_COLUMNS} WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(Book::try_from).transpose()
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Add `delta` (which may be negative) to a book's stock.
    ///
    /// Uses the same guarded update as checkout, so a concurrent sale can
    /// never be driven below zero by a manual correction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book does not exist.
    /// Returns `RepositoryError::Conflict` if the result would be negative or
    /// would not fit the stock column.
    pub async fn adjust_stock(&self, id: BookId, delta: i32) -> Result<i32, RepositoryError> {
        let updated = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE books
            SET stock_quantity = (stock_quantity::BIGINT + $1)::INTEGER
            WHERE id = $2 AND stock_quantity::BIGINT + $1 BETWEEN 0 AND 2147483647
            RETURNING stock_quantity
            ",
        )
        .bind(delta)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        if let Some(stock) = updated {
            tracing::info!(book_id = %id, delta, stock, "Stock adjusted");
            return Ok(stock);
        }

        let current =
            sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM books WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        match current {
            Some(available) if delta < 0 => Err(RepositoryError::Conflict(format!(
                "cannot remove {} units, only {available} in stock",
                delta.unsigned_abs()
            ))),
            Some(available) => Err(RepositoryError::Conflict(format!(
                "cannot add {delta} units to {available}, stock would exceed {}",
                i32::MAX
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }
}

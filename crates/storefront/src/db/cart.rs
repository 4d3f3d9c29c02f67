//! Cart repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use bookshelf_core::{BookId, CartItemId, Quantity, UserId};

use super::{RepositoryError, to_price, to_quantity};
use crate::models::{CartItem, CartView};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartItemId,
    book_id: BookId,
    quantity: i32,
    title: String,
    author: String,
    price: Decimal,
    stock_quantity: i32,
}

impl TryFrom<CartRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let quantity = to_quantity(row.quantity, "cart_items.quantity")?;
        let price = to_price(row.price, "books.price")?;
        let subtotal = price
            .times(quantity)
            .map_err(|e| RepositoryError::DataCorruption(format!("cart line {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            book_id: row.book_id,
            quantity,
            title: row.title,
            author: row.author,
            price,
            stock_quantity: row.stock_quantity,
            subtotal,
        })
    }
}

/// Repository for a customer's cart outside checkout.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The customer's cart joined with current book data.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn view(&self, user_id: UserId) -> Result<CartView, RepositoryError> {
        let rows = sqlx::query_as::<_, CartRow>(
            r"
            SELECT ci.id, ci.book_id, ci.quantity, b.title, b.author, b.price, b.stock_quantity
            FROM cart_items ci
            JOIN books b ON b.id = ci.book_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at, ci.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(CartItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        CartView::from_items(items)
            .map_err(|e| RepositoryError::DataCorruption(format!("cart total: {e}")))
    }

    /// Add `quantity` of a book, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book does not exist.
    /// Returns `RepositoryError::Conflict` if the merged quantity would not
    /// fit the quantity column.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<CartItemId, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartItemId>(
            r"
            INSERT INTO cart_items (user_id, book_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, book_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            WHERE cart_items.quantity::BIGINT + EXCLUDED.quantity <= 2147483647
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(quantity.get())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        id.ok_or_else(|| {
            RepositoryError::Conflict(format!(
                "cart quantity for book {book_id} would exceed {}",
                i32::MAX
            ))
        })
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book is not in the cart.
    pub async fn update(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $1 WHERE user_id = $2 AND book_id = $3",
        )
        .bind(quantity.get())
        .bind(user_id)
        .bind(book_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove a book from the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book is not in the cart.
    pub async fn remove(&self, user_id: UserId, book_id: BookId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

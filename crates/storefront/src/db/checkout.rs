//! `PostgreSQL` checkout store.
//!
//! Every method runs on one `sqlx` transaction. Dropping [`PgCheckoutTx`]
//! without committing rolls it back.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use bookshelf_core::{
    AddressId, BookId, CartItemId, OrderId, OrderItemId, OrderNumber, OrderStatus, Quantity,
    UserId,
};

use super::{RepositoryError, to_price, to_quantity};
use crate::models::{CartLine, ShippingDetails};
use crate::services::checkout::{
    BookStock, CheckoutStore, CheckoutTx, ExistingOrder, IdempotencyKey, NewOrder, PricedLine,
};

/// Label stored in `orders.payment_method`; no gateway is involved.
pub const PAYMENT_METHOD: &str = "mock";

/// Checkout store backed by a connection pool.
#[derive(Debug, Clone)]
pub struct PgCheckoutStore {
    pool: PgPool,
}

impl PgCheckoutStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CheckoutStore for PgCheckoutStore {
    type Tx = PgCheckoutTx;

    async fn begin(&self) -> Result<PgCheckoutTx, RepositoryError> {
        Ok(PgCheckoutTx {
            tx: self.pool.begin().await?,
        })
    }
}

/// An open checkout transaction.
pub struct PgCheckoutTx {
    tx: Transaction<'static, Postgres>,
}

impl CheckoutTx for PgCheckoutTx {
    async fn lock_customer(&mut self, user_id: UserId) -> Result<bool, RepositoryError> {
        // NO KEY UPDATE still lets cart inserts take their FK share lock.
        let row = sqlx::query("SELECT id FROM users WHERE id = $1 FOR NO KEY UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.is_some())
    }

    async fn find_order_by_idempotency_key(
        &mut self,
        user_id: UserId,
        key: &IdempotencyKey,
    ) -> Result<Option<ExistingOrder>, RepositoryError> {
        let row = sqlx::query_as::<_, (OrderId, OrderNumber, Decimal)>(
            r"
            SELECT id, order_number, total_amount
            FROM orders
            WHERE user_id = $1 AND idempotency_key = $2
            ",
        )
        .bind(user_id)
        .bind(key.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(|(id, order_number, total)| {
            Ok(ExistingOrder {
                id,
                order_number,
                total_amount: to_price(total, "total_amount")?,
            })
        })
        .transpose()
    }

    async fn insert_address(
        &mut self,
        user_id: UserId,
        details: &ShippingDetails,
    ) -> Result<AddressId, RepositoryError> {
        let id = sqlx::query_scalar::<_, AddressId>(
            r"
            INSERT INTO addresses
                (user_id, full_name, phone, address_line1, address_line2,
                 city, state, postal_code, country, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(&details.full_name)
        .bind(&details.phone)
        .bind(&details.address_line1)
        .bind(&details.address_line2)
        .bind(&details.city)
        .bind(&details.state)
        .bind(&details.postal_code)
        .bind(&details.country)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn cart_snapshot(&mut self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, (CartItemId, BookId, i32)>(
            r"
            SELECT id, book_id, quantity
            FROM cart_items
            WHERE user_id = $1
            ORDER BY book_id
            FOR UPDATE
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|(id, book_id, quantity)| {
                Ok(CartLine {
                    id,
                    book_id,
                    quantity: to_quantity(quantity, "cart_items.quantity")?,
                })
            })
            .collect()
    }

    async fn book_stock(&mut self, book_id: BookId) -> Result<Option<BookStock>, RepositoryError> {
        let row = sqlx::query_as::<_, (Decimal, i32)>(
            "SELECT price, stock_quantity FROM books WHERE id = $1",
        )
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(|(price, stock_quantity)| {
            Ok(BookStock {
                price: to_price(price, "books.price")?,
                stock_quantity,
            })
        })
        .transpose()
    }

    async fn insert_order(&mut self, order: NewOrder<'_>) -> Result<Option<OrderId>, RepositoryError> {
        // A taken order number yields no row; the transaction stays usable.
        let id = sqlx::query_scalar::<_, OrderId>(
            r"
            INSERT INTO orders
                (user_id, order_number, total_amount, status,
                 shipping_address_id, payment_method, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            RETURNING id
            ",
        )
        .bind(order.user_id)
        .bind(order.order_number)
        .bind(order.total_amount.amount())
        .bind(OrderStatus::Pending)
        .bind(order.shipping_address_id)
        .bind(PAYMENT_METHOD)
        .bind(order.idempotency_key.map(IdempotencyKey::as_str))
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn insert_order_item(
        &mut self,
        order_id: OrderId,
        line: &PricedLine,
    ) -> Result<OrderItemId, RepositoryError> {
        let id = sqlx::query_scalar::<_, OrderItemId>(
            r"
            INSERT INTO order_items (order_id, book_id, quantity, price_at_purchase, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(order_id)
        .bind(line.book_id)
        .bind(line.quantity.get())
        .bind(line.unit_price.amount())
        .bind(line.subtotal.amount())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn decrement_stock(
        &mut self,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE books
            SET stock_quantity = stock_quantity - $1
            WHERE id = $2 AND stock_quantity >= $1
            ",
        )
        .bind(quantity.get())
        .bind(book_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_cart_lines(
        &mut self,
        user_id: UserId,
        ids: &[CartItemId],
    ) -> Result<u64, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(CartItemId::as_i32).collect();
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

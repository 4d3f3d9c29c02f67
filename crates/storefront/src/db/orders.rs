//! Order history and administration.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bookshelf_core::{
    AddressId, BookId, OrderId, OrderItemId, OrderNumber, OrderStatus, UserId,
};

use super::{RepositoryError, to_price, to_quantity};
use crate::models::{Address, Order, OrderDetail, OrderItem};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    order_number: OrderNumber,
    total_amount: Decimal,
    status: OrderStatus,
    shipping_address_id: AddressId,
    payment_method: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            order_number: row.order_number,
            total_amount: to_price(row.total_amount, "orders.total_amount")?,
            status: row.status,
            shipping_address_id: row.shipping_address_id,
            payment_method: row.payment_method,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    book_id: BookId,
    quantity: i32,
    price_at_purchase: Decimal,
    subtotal: Decimal,
    book_title: String,
    book_author: String,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            book_id: row.book_id,
            quantity: to_quantity(row.quantity, "order_items.quantity")?,
            price_at_purchase: to_price(row.price_at_purchase, "order_items.price_at_purchase")?,
            subtotal: to_price(row.subtotal, "order_items.subtotal")?,
            book_title: row.book_title,
            book_author: row.book_author,
        })
    }
}

const ORDER_COLUMNS: &str = r"
    SELECT id, user_id, order_number, total_amount, status, shipping_address_id,
           payment_method, created_at, updated_at
    FROM orders
";

/// Repository for placed orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_COLUMNS} WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// An order with its address and lines, if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if the address row is missing.
    pub async fn detail_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_COLUMNS} WHERE id = $1 AND user_id = $2"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = Order::try_from(row)?;

        let shipping_address = sqlx::query_as::<_, Address>(
            r"
            SELECT id, user_id, full_name, phone, address_line1, address_line2,
                   city, state, postal_code, country, is_default, created_at
            FROM addresses
            WHERE id = $1
            ",
        )
        .bind(order.shipping_address_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!("order {} has no shipping address", order.id))
        })?;

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT oi.id, oi.order_id, oi.book_id, oi.quantity, oi.price_at_purchase,
                   oi.subtotal, b.title AS book_title, b.author AS book_author
            FROM order_items oi
            JOIN books b ON b.id = oi.book_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(order.id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(OrderItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(OrderDetail {
            order,
            shipping_address,
            items,
        }))
    }

    /// Set an order's status. Any status may follow any other.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE orders
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, user_id, order_number, total_amount, status, shipping_address_id,
                      payment_method, created_at, updated_at
            ",
        )
        .bind(status)
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tracing::info!(order_id = %order_id, %status, "Order status updated");
        Order::try_from(row)
    }
}

//! Order models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookshelf_core::{
    AddressId, BookId, OrderId, OrderItemId, OrderNumber, OrderStatus, Price, Quantity, UserId,
};

use super::Address;

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: OrderNumber,
    pub total_amount: Price,
    pub status: OrderStatus,
    pub shipping_address_id: AddressId,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of a placed order, with the book's title and author joined in.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub book_id: BookId,
    pub quantity: Quantity,
    pub price_at_purchase: Price,
    pub subtotal: Price,
    pub book_title: String,
    pub book_author: String,
}

/// An order with its shipping address and lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub shipping_address: Address,
    pub items: Vec<OrderItem>,
}

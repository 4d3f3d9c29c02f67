//! Storage seam for the checkout engine.
//!
//! The engine only talks to storage through [`CheckoutTx`], so the same
//! algorithm runs against `PostgreSQL` in production and against the
//! in-memory store in unit tests.

use std::future::Future;

use bookshelf_core::{
    AddressId, BookId, CartItemId, OrderId, OrderItemId, OrderNumber, Price, Quantity, UserId,
};

use super::IdempotencyKey;
use crate::db::RepositoryError;
use crate::models::{CartLine, ShippingDetails};

/// Price and stock of a book as seen inside the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookStock {
    pub price: Price,
    pub stock_quantity: i32,
}

/// An order that already exists for an idempotency key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingOrder {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub total_amount: Price,
}

/// Values for a new `orders` row.
#[derive(Debug, Clone, Copy)]
pub struct NewOrder<'a> {
    pub user_id: UserId,
    pub order_number: &'a OrderNumber,
    pub total_amount: Price,
    pub shipping_address_id: AddressId,
    pub idempotency_key: Option<&'a IdempotencyKey>,
}

/// A validated cart line with the price read inside the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub cart_item_id: CartItemId,
    pub book_id: BookId,
    pub quantity: Quantity,
    pub unit_price: Price,
    pub subtotal: Price,
}

/// Something that can open checkout transactions.
pub trait CheckoutStore: Send + Sync {
    /// Transaction handle. Dropping it without calling
    /// [`CheckoutTx::commit`] rolls back every write made through it.
    type Tx: CheckoutTx;

    /// Open a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, RepositoryError>> + Send;
}

/// Storage operations performed inside one checkout transaction.
pub trait CheckoutTx: Send {
    /// Lock the customer row so checkouts of the same customer run one at a
    /// time. Returns `false` if the customer does not exist.
    fn lock_customer(
        &mut self,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Find an order previously placed by `user_id` with `key`.
    fn find_order_by_idempotency_key(
        &mut self,
        user_id: UserId,
        key: &IdempotencyKey,
    ) -> impl Future<Output = Result<Option<ExistingOrder>, RepositoryError>> + Send;

    /// Store a shipping address snapshot.
    fn insert_address(
        &mut self,
        user_id: UserId,
        details: &ShippingDetails,
    ) -> impl Future<Output = Result<AddressId, RepositoryError>> + Send;

    /// Read and lock the customer's cart lines, ordered by book id.
    fn cart_snapshot(
        &mut self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<CartLine>, RepositoryError>> + Send;

    /// Current price and stock of a book, or `None` if it no longer exists.
    fn book_stock(
        &mut self,
        book_id: BookId,
    ) -> impl Future<Output = Result<Option<BookStock>, RepositoryError>> + Send;

    /// Insert an order. Returns `None` if the order number is already taken.
    fn insert_order(
        &mut self,
        order: NewOrder<'_>,
    ) -> impl Future<Output = Result<Option<OrderId>, RepositoryError>> + Send;

    /// Insert one order line.
    fn insert_order_item(
        &mut self,
        order_id: OrderId,
        line: &PricedLine,
    ) -> impl Future<Output = Result<OrderItemId, RepositoryError>> + Send;

    /// Take `quantity` units from a book's stock if at least that many
    /// remain. Returns `false` if the guard rejected the update.
    fn decrement_stock(
        &mut self,
        book_id: BookId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete the given cart lines of `user_id`. Returns the number deleted.
    fn delete_cart_lines(
        &mut self,
        user_id: UserId,
        ids: &[CartItemId],
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    /// Make every write durable.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

//! Checkout: turn a customer's cart into an order.
//!
//! One call to [`CheckoutService::place_order`] runs inside one storage
//! transaction:
//!
//! 1. Lock the customer row (checkouts of one customer serialize)
//! 2. Replay an existing order for the same idempotency key, if any
//! 3. Store the shipping address snapshot
//! 4. Read and lock the cart lines
//! 5. Re-read price and stock of every book and validate
//! 6. Insert the order under a fresh order number
//! 7. Insert each line and take its stock with a guarded decrement
//! 8. Delete the purchased cart lines
//! 9. Commit
//!
//! Any error drops the transaction, which rolls everything back. Steps 1-8
//! run under a deadline; hitting it drops the transaction the same way.
//! Commit is not cut short, so a committed order is never reported as a
//! timeout.

mod error;
pub mod idempotency;
pub mod order_number;
pub mod store;

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use bookshelf_core::{AddressId, OrderId, OrderNumber, Price, UserId};

pub use error::CheckoutError;
pub use idempotency::{IDEMPOTENCY_KEY_HEADER, IdempotencyKey, IdempotencyKeyError};
pub use store::{BookStock, CheckoutStore, CheckoutTx, ExistingOrder, NewOrder, PricedLine};

use crate::config::CheckoutConfig;
use crate::models::{CartLine, ShippingDetails};

/// Input to [`CheckoutService::place_order`].
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub shipping: ShippingDetails,
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub total_amount: Price,
    /// `true` if an earlier order with the same idempotency key was returned.
    #[serde(skip)]
    pub replayed: bool,
}

impl From<ExistingOrder> for PlacedOrder {
    fn from(order: ExistingOrder) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number,
            total_amount: order.total_amount,
            replayed: true,
        }
    }
}

/// Outcome of the work done under the deadline.
enum Prepared<T> {
    /// An earlier order with the same idempotency key; nothing to commit.
    Replay(PlacedOrder),
    /// All writes staged in `tx`, waiting for commit.
    Ready { tx: T, placed: PlacedOrder },
}

/// The checkout transaction engine.
#[derive(Debug, Clone)]
pub struct CheckoutService<S> {
    store: S,
    timeout: Duration,
    order_number_attempts: u32,
}

impl<S: CheckoutStore> CheckoutService<S> {
    /// Create an engine over `store`.
    #[must_use]
    pub const fn new(store: S, config: CheckoutConfig) -> Self {
        Self {
            store,
            timeout: config.timeout,
            order_number_attempts: config.order_number_attempts,
        }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Place an order from the customer's current cart.
    ///
    /// # Errors
    ///
    /// - `EmptyCart` if the cart has no lines
    /// - `InsufficientStock` if any book cannot cover its line
    /// - `AddressPersist`, `Storage`, `Pricing`, `OrderNumber`,
    ///   `OrderNumberExhausted` for server-side failures
    /// - `Timeout` if the deadline passes before commit starts
    ///
    /// On every error no write is left behind.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: &CheckoutRequest,
    ) -> Result<PlacedOrder, CheckoutError> {
        let Ok(prepared) =
            tokio::time::timeout(self.timeout, self.prepare(user_id, request)).await
        else {
            tracing::warn!(timeout = ?self.timeout, "Checkout timed out");
            return Err(CheckoutError::Timeout);
        };

        // Commit runs outside the deadline: once COMMIT is sent the outcome
        // must be reported as-is, never as a timeout.
        let result = match prepared {
            Ok(Prepared::Replay(placed)) => Ok(placed),
            Ok(Prepared::Ready { tx, placed }) => {
                tx.commit().await.map(|()| placed).map_err(CheckoutError::from)
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(placed) if placed.replayed => {
                tracing::info!(order_number = %placed.order_number, "Checkout replayed");
            }
            Ok(placed) => {
                tracing::info!(
                    order_id = %placed.order_id,
                    order_number = %placed.order_number,
                    total = %placed.total_amount,
                    "Order placed"
                );
            }
            Err(e) if e.is_client_error() => tracing::info!(error = %e, "Checkout rejected"),
            Err(e) => tracing::error!(error = %e, "Checkout failed"),
        }
        result
    }

    async fn prepare(
        &self,
        user_id: UserId,
        request: &CheckoutRequest,
    ) -> Result<Prepared<S::Tx>, CheckoutError> {
        let mut tx = self.store.begin().await?;

        if !tx.lock_customer(user_id).await? {
            return Err(CheckoutError::UnknownCustomer(user_id));
        }

        if let Some(key) = &request.idempotency_key
            && let Some(existing) = tx.find_order_by_idempotency_key(user_id, key).await?
        {
            return Ok(Prepared::Replay(existing.into()));
        }

        let address_id = tx
            .insert_address(user_id, &request.shipping)
            .await
            .map_err(CheckoutError::AddressPersist)?;

        let snapshot = tx.cart_snapshot(user_id).await?;
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let lines = price_lines(&mut tx, &snapshot).await?;
        let total_amount = Price::total(lines.iter().map(|line| line.subtotal))?;

        let (order_id, order_number) = self
            .insert_order(&mut tx, user_id, total_amount, address_id, request)
            .await?;

        for line in &lines {
            tx.insert_order_item(order_id, line).await?;
            if !tx.decrement_stock(line.book_id, line.quantity).await? {
                let available = tx
                    .book_stock(line.book_id)
                    .await?
                    .map_or(0, |book| book.stock_quantity);
                return Err(CheckoutError::InsufficientStock {
                    book_id: line.book_id,
                    requested: line.quantity.get(),
                    available,
                });
            }
        }

        let purchased: Vec<_> = lines.iter().map(|line| line.cart_item_id).collect();
        tx.delete_cart_lines(user_id, &purchased).await?;

        Ok(Prepared::Ready {
            tx,
            placed: PlacedOrder {
                order_id,
                order_number,
                total_amount,
                replayed: false,
            },
        })
    }

    async fn insert_order(
        &self,
        tx: &mut S::Tx,
        user_id: UserId,
        total_amount: Price,
        shipping_address_id: AddressId,
        request: &CheckoutRequest,
    ) -> Result<(OrderId, OrderNumber), CheckoutError> {
        for attempt in 1..=self.order_number_attempts {
            let order_number = order_number::generate(Utc::now().date_naive(), &mut rand::rng())?;
            let order = NewOrder {
                user_id,
                order_number: &order_number,
                total_amount,
                shipping_address_id,
                idempotency_key: request.idempotency_key.as_ref(),
            };
            if let Some(order_id) = tx.insert_order(order).await? {
                return Ok((order_id, order_number));
            }
            tracing::warn!(attempt, %order_number, "Order number collision");
        }
        Err(CheckoutError::OrderNumberExhausted {
            attempts: self.order_number_attempts,
        })
    }
}

/// Validate every snapshot line against current stock and price it.
async fn price_lines<T: CheckoutTx>(
    tx: &mut T,
    snapshot: &[CartLine],
) -> Result<Vec<PricedLine>, CheckoutError> {
    let mut lines = Vec::with_capacity(snapshot.len());
    for line in snapshot {
        let book = tx.book_stock(line.book_id).await?;
        let Some(book) = book.filter(|b| b.stock_quantity >= line.quantity.get()) else {
            return Err(CheckoutError::InsufficientStock {
                book_id: line.book_id,
                requested: line.quantity.get(),
                available: book.map_or(0, |b| b.stock_quantity),
            });
        };
        lines.push(PricedLine {
            cart_item_id: line.id,
            book_id: line.book_id,
            quantity: line.quantity,
            unit_price: book.price,
            subtotal: book.price.times(line.quantity)?,
        });
    }
    Ok(lines)
}

//! In-memory checkout store.
//!
//! Transactions are serialized behind one async mutex: `begin` takes the lock
//! and clones the tables into a working copy, `commit` writes the copy back,
//! and dropping the transaction discards it. Faults can be injected at named
//! steps to exercise rollback paths without a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;

use bookshelf_core::{
    AddressId, BookId, CartItemId, OrderId, OrderItemId, OrderNumber, OrderStatus, Price,
    Quantity, UserId,
};

use super::RepositoryError;
use crate::models::{CartLine, ShippingDetails};
use crate::services::checkout::{
    BookStock, CheckoutStore, CheckoutTx, ExistingOrder, IdempotencyKey, NewOrder, PricedLine,
};

/// Steps at which a fault can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertAddress,
    InsertOrderItem,
    DecrementStock,
    DeleteCart,
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBook {
    pub title: String,
    pub price: Price,
    pub stock_quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryCartLine {
    pub user_id: UserId,
    pub book_id: BookId,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryAddress {
    pub user_id: UserId,
    pub details: ShippingDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOrder {
    pub user_id: UserId,
    pub order_number: OrderNumber,
    pub total_amount: Price,
    pub status: OrderStatus,
    pub shipping_address_id: AddressId,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOrderItem {
    pub order_id: OrderId,
    pub book_id: BookId,
    pub quantity: Quantity,
    pub price_at_purchase: Price,
    pub subtotal: Price,
}

/// Committed contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    /// User id to `is_admin`.
    pub users: BTreeMap<UserId, bool>,
    pub books: BTreeMap<BookId, MemoryBook>,
    pub cart: BTreeMap<CartItemId, MemoryCartLine>,
    pub addresses: BTreeMap<AddressId, MemoryAddress>,
    pub orders: BTreeMap<OrderId, MemoryOrder>,
    pub order_items: BTreeMap<OrderItemId, MemoryOrderItem>,
    last_id: i32,
}

impl MemoryTables {
    /// Cart lines belonging to `user_id`.
    pub fn cart_of(&self, user_id: UserId) -> impl Iterator<Item = &MemoryCartLine> {
        self.cart.values().filter(move |line| line.user_id == user_id)
    }

    /// Lines of `order_id`.
    pub fn items_of(&self, order_id: OrderId) -> impl Iterator<Item = &MemoryOrderItem> {
        self.order_items
            .values()
            .filter(move |item| item.order_id == order_id)
    }

    const fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Debug, Default)]
struct Faults {
    /// Fail the nth call (1-based) of a step.
    fail_at: Option<(FailPoint, usize)>,
    stall_at: Option<(FailPoint, Duration)>,
    /// Delay returning from a successful commit, after the writes landed.
    stall_after_commit: Option<Duration>,
    order_number_collisions: u32,
    /// Stock left by a competing sale that lands just before the decrement.
    concurrent_sale: Option<(BookId, i32)>,
}

/// In-memory [`CheckoutStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<tokio::sync::Mutex<MemoryTables>>,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, is_admin: bool) -> UserId {
        let mut tables = self.tables.lock().await;
        let id = UserId::new(tables.next_id());
        tables.users.insert(id, is_admin);
        id
    }

    pub async fn add_book(&self, title: &str, price: Price, stock_quantity: i32) -> BookId {
        let mut tables = self.tables.lock().await;
        let id = BookId::new(tables.next_id());
        tables.books.insert(
            id,
            MemoryBook {
                title: title.to_owned(),
                price,
                stock_quantity,
            },
        );
        id
    }

    pub async fn remove_book(&self, book_id: BookId) {
        self.tables.lock().await.books.remove(&book_id);
    }

    /// Add a cart line, merging with an existing line for the same book.
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: Quantity,
    ) -> CartItemId {
        let mut tables = self.tables.lock().await;
        let existing = tables
            .cart
            .iter_mut()
            .find(|(_, line)| line.user_id == user_id && line.book_id == book_id);
        if let Some((id, line)) = existing {
            let merged = line.quantity.get().saturating_add(quantity.get());
            line.quantity = Quantity::new(merged).unwrap_or(line.quantity);
            return *id;
        }
        let id = CartItemId::new(tables.next_id());
        tables.cart.insert(
            id,
            MemoryCartLine {
                user_id,
                book_id,
                quantity,
            },
        );
        id
    }

    /// A copy of the committed tables.
    pub async fn tables(&self) -> MemoryTables {
        self.tables.lock().await.clone()
    }

    /// Fail the `nth` call (1-based) of `point` in the next transactions.
    pub fn fail_at(&self, point: FailPoint, nth: usize) {
        self.faults().fail_at = Some((point, nth));
    }

    /// Sleep for `duration` on every call of `point`.
    pub fn stall_at(&self, point: FailPoint, duration: Duration) {
        self.faults().stall_at = Some((point, duration));
    }

    /// Sleep for `duration` after a commit has written its tables.
    pub fn stall_after_commit(&self, duration: Duration) {
        self.faults().stall_after_commit = Some(duration);
    }

    /// Treat the next `times` order inserts as order number collisions.
    pub fn collide_order_numbers(&self, times: u32) {
        self.faults().order_number_collisions = times;
    }

    /// Make a competing checkout commit just before the next decrement of
    /// `book_id`, leaving `remaining` copies.
    pub fn simulate_concurrent_sale(&self, book_id: BookId, remaining: i32) {
        self.faults().concurrent_sale = Some((book_id, remaining));
    }

    pub fn clear_faults(&self) {
        *self.faults() = Faults::default();
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CheckoutStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, RepositoryError> {
        let committed = Arc::clone(&self.tables).lock_owned().await;
        let work = committed.clone();
        Ok(MemoryTx {
            committed,
            work,
            faults: Arc::clone(&self.faults),
            calls: HashMap::new(),
        })
    }
}

/// Transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTx {
    committed: OwnedMutexGuard<MemoryTables>,
    work: MemoryTables,
    faults: Arc<Mutex<Faults>>,
    calls: HashMap<FailPoint, usize>,
}

impl MemoryTx {
    async fn step(&mut self, point: FailPoint) -> Result<(), RepositoryError> {
        let call = self.calls.entry(point).or_default();
        *call += 1;
        let call = *call;

        let (fail, stall) = {
            let faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
            let fail = faults.fail_at == Some((point, call));
            let stall = faults
                .stall_at
                .filter(|(p, _)| *p == point)
                .map(|(_, d)| d);
            (fail, stall)
        };

        if let Some(duration) = stall {
            tokio::time::sleep(duration).await;
        }
        if fail {
            return Err(RepositoryError::Injected(step_name(point)));
        }
        Ok(())
    }

    fn take_collision(&self) -> bool {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        if faults.order_number_collisions == 0 {
            return false;
        }
        faults.order_number_collisions -= 1;
        true
    }

    fn take_concurrent_sale(&self, book_id: BookId) -> Option<i32> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        match faults.concurrent_sale {
            Some((id, remaining)) if id == book_id => {
                faults.concurrent_sale = None;
                Some(remaining)
            }
            _ => None,
        }
    }
}

const fn step_name(point: FailPoint) -> &'static str {
    match point {
        FailPoint::InsertAddress => "insert address",
        FailPoint::InsertOrderItem => "insert order item",
        FailPoint::DecrementStock => "decrement stock",
        FailPoint::DeleteCart => "delete cart lines",
        FailPoint::Commit => "commit",
    }
}

impl CheckoutTx for MemoryTx {
    async fn lock_customer(&mut self, user_id: UserId) -> Result<bool, RepositoryError> {
        Ok(self.work.users.contains_key(&user_id))
    }

    async fn find_order_by_idempotency_key(
        &mut self,
        user_id: UserId,
        key: &IdempotencyKey,
    ) -> Result<Option<ExistingOrder>, RepositoryError> {
        Ok(self
            .work
            .orders
            .iter()
            .find(|(_, order)| {
                order.user_id == user_id && order.idempotency_key.as_deref() == Some(key.as_str())
            })
            .map(|(id, order)| ExistingOrder {
                id: *id,
                order_number: order.order_number.clone(),
                total_amount: order.total_amount,
            }))
    }

    async fn insert_address(
        &mut self,
        user_id: UserId,
        details: &ShippingDetails,
    ) -> Result<AddressId, RepositoryError> {
        self.step(FailPoint::InsertAddress).await?;
        let id = AddressId::new(self.work.next_id());
        self.work.addresses.insert(
            id,
            MemoryAddress {
                user_id,
                details: details.clone(),
            },
        );
        Ok(id)
    }

    async fn cart_snapshot(&mut self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let mut lines: Vec<_> = self
            .work
            .cart
            .iter()
            .filter(|(_, line)| line.user_id == user_id)
            .map(|(id, line)| CartLine {
                id: *id,
                book_id: line.book_id,
                quantity: line.quantity,
            })
            .collect();
        lines.sort_by_key(|line| line.book_id);
        Ok(lines)
    }

    async fn book_stock(&mut self, book_id: BookId) -> Result<Option<BookStock>, RepositoryError> {
        Ok(self.work.books.get(&book_id).map(|book| BookStock {
            price: book.price,
            stock_quantity: book.stock_quantity,
        }))
    }

    async fn insert_order(&mut self, order: NewOrder<'_>) -> Result<Option<OrderId>, RepositoryError> {
        let taken = self
            .work
            .orders
            .values()
            .any(|existing| &existing.order_number == order.order_number);
        if taken || self.take_collision() {
            return Ok(None);
        }
        let id = OrderId::new(self.work.next_id());
        self.work.orders.insert(
            id,
            MemoryOrder {
                user_id: order.user_id,
                order_number: order.order_number.clone(),
                total_amount: order.total_amount,
                status: OrderStatus::Pending,
                shipping_address_id: order.shipping_address_id,
                idempotency_key: order.idempotency_key.map(|key| key.as_str().to_owned()),
            },
        );
        Ok(Some(id))
    }

    async fn insert_order_item(
        &mut self,
        order_id: OrderId,
        line: &PricedLine,
    ) -> Result<OrderItemId, RepositoryError> {
        self.step(FailPoint::InsertOrderItem).await?;
        let id = OrderItemId::new(self.work.next_id());
        self.work.order_items.insert(
            id,
            MemoryOrderItem {
                order_id,
                book_id: line.book_id,
                quantity: line.quantity,
                price_at_purchase: line.unit_price,
                subtotal: line.subtotal,
            },
        );
        Ok(id)
    }

    async fn decrement_stock(
        &mut self,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        self.step(FailPoint::DecrementStock).await?;
        if let Some(remaining) = self.take_concurrent_sale(book_id) {
            // The competing sale is already committed.
            for tables in [&mut *self.committed, &mut self.work] {
                if let Some(book) = tables.books.get_mut(&book_id) {
                    book.stock_quantity = remaining;
                }
            }
        }
        match self.work.books.get_mut(&book_id) {
            Some(book) if book.stock_quantity >= quantity.get() => {
                book.stock_quantity -= quantity.get();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_cart_lines(
        &mut self,
        user_id: UserId,
        ids: &[CartItemId],
    ) -> Result<u64, RepositoryError> {
        self.step(FailPoint::DeleteCart).await?;
        let before = self.work.cart.len();
        self.work
            .cart
            .retain(|id, line| !(line.user_id == user_id && ids.contains(id)));
        Ok(u64::try_from(before - self.work.cart.len()).unwrap_or(u64::MAX))
    }

    async fn commit(mut self) -> Result<(), RepositoryError> {
        self.step(FailPoint::Commit).await?;
        let Self {
            mut committed,
            work,
            faults,
            ..
        } = self;
        *committed = work;
        drop(committed);

        let stall = faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stall_after_commit;
        if let Some(duration) = stall {
            tokio::time::sleep(duration).await;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn price(cents: i64) -> Price {
        Price::from_cents(cents).unwrap()
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        let book = store.add_book("Book", price(100), 3).await;

        {
            let mut tx = store.begin().await.unwrap();
            assert!(tx.decrement_stock(book, Quantity::ONE).await.unwrap());
        }

        assert_eq!(store.tables().await.books[&book].stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();
        let book = store.add_book("Book", price(100), 3).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.decrement_stock(book, Quantity::ONE).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.tables().await.books[&book].stock_quantity, 2);
    }

    #[tokio::test]
    async fn test_guarded_decrement() {
        let store = MemoryStore::new();
        let book = store.add_book("Book", price(100), 1).await;

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.decrement_stock(book, Quantity::new(2).unwrap()).await.unwrap());
        assert!(tx.decrement_stock(book, Quantity::ONE).await.unwrap());
        assert!(!tx.decrement_stock(book, Quantity::ONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_to_cart_merges_lines() {
        let store = MemoryStore::new();
        let user = store.add_user(false).await;
        let book = store.add_book("Book", price(100), 1).await;

        let first = store.add_to_cart(user, book, Quantity::ONE).await;
        let second = store.add_to_cart(user, book, Quantity::new(2).unwrap()).await;

        assert_eq!(first, second);
        assert_eq!(store.tables().await.cart[&first].quantity.get(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_is_ordered_by_book() {
        let store = MemoryStore::new();
        let user = store.add_user(false).await;
        let a = store.add_book("A", price(100), 1).await;
        let b = store.add_book("B", price(100), 1).await;
        store.add_to_cart(user, b, Quantity::ONE).await;
        store.add_to_cart(user, a, Quantity::ONE).await;

        let mut tx = store.begin().await.unwrap();
        let books: Vec<_> = tx
            .cart_snapshot(user)
            .await
            .unwrap()
            .into_iter()
            .map(|line| line.book_id)
            .collect();

        assert_eq!(books, vec![a, b]);
    }

    #[tokio::test]
    async fn test_fail_point_hits_nth_call_only() {
        let store = MemoryStore::new();
        let book = store.add_book("Book", price(100), 5).await;
        store.fail_at(FailPoint::DecrementStock, 2);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.decrement_stock(book, Quantity::ONE).await.is_ok());
        assert!(matches!(
            tx.decrement_stock(book, Quantity::ONE).await,
            Err(RepositoryError::Injected("decrement stock"))
        ));
        assert!(tx.decrement_stock(book, Quantity::ONE).await.is_ok());

        store.clear_faults();
    }
}

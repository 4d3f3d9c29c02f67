//! Checkout engine against `PostgreSQL`.
//!
//! These tests require a reachable `PostgreSQL` server in `DATABASE_URL`.
//!
//! Run with: cargo test -p bookshelf-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;

use bookshelf_core::{OrderStatus, Quantity};
use bookshelf_integration_tests::{count_rows, insert_book, insert_user, shipping, stock_of};
use bookshelf_storefront::config::CheckoutConfig;
use bookshelf_storefront::db::{CartRepository, OrderRepository, PgCheckoutStore};
use bookshelf_storefront::services::checkout::IdempotencyKey;
use bookshelf_storefront::services::{CheckoutError, CheckoutRequest, CheckoutService};

fn service(pool: &PgPool) -> CheckoutService<PgCheckoutStore> {
    CheckoutService::new(PgCheckoutStore::new(pool.clone()), CheckoutConfig::default())
}

fn request() -> CheckoutRequest {
    CheckoutRequest {
        shipping: shipping(),
        idempotency_key: None,
    }
}

fn qty(n: i32) -> Quantity {
    Quantity::new(n).unwrap()
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_checkout_commits_order_and_clears_cart(pool: PgPool) {
    let user = insert_user(&pool, "a@example.com").await.unwrap();
    let book_a = insert_book(&pool, "A", 1999, 10).await.unwrap();
    let book_b = insert_book(&pool, "B", 500, 4).await.unwrap();
    let cart = CartRepository::new(&pool);
    cart.add(user, book_a, qty(2)).await.unwrap();
    cart.add(user, book_b, qty(3)).await.unwrap();

    let placed = service(&pool).place_order(user, &request()).await.unwrap();

    assert_eq!(placed.total_amount.amount(), Decimal::new(5498, 2));
    assert!(!placed.replayed);
    assert_eq!(stock_of(&pool, book_a).await.unwrap(), 8);
    assert_eq!(stock_of(&pool, book_b).await.unwrap(), 1);
    assert!(cart.view(user).await.unwrap().items.is_empty());

    let detail = OrderRepository::new(&pool)
        .detail_for_user(user, placed.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.order.payment_method, "mock");
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.shipping_address.details.city, "Springfield");
    assert_eq!(detail.order.order_number, placed.order_number);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_insufficient_stock_leaves_no_writes(pool: PgPool) {
    let user = insert_user(&pool, "b@example.com").await.unwrap();
    let plenty = insert_book(&pool, "Plenty", 1000, 10).await.unwrap();
    let scarce = insert_book(&pool, "Scarce", 1000, 1).await.unwrap();
    let cart = CartRepository::new(&pool);
    cart.add(user, plenty, qty(1)).await.unwrap();
    cart.add(user, scarce, qty(2)).await.unwrap();

    let err = service(&pool).place_order(user, &request()).await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::InsufficientStock { book_id, requested: 2, available: 1 } if book_id == scarce
    ));
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 0);
    assert_eq!(count_rows(&pool, "order_items").await.unwrap(), 0);
    assert_eq!(count_rows(&pool, "addresses").await.unwrap(), 0);
    assert_eq!(stock_of(&pool, plenty).await.unwrap(), 10);
    assert_eq!(cart.view(user).await.unwrap().items.len(), 2);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_empty_cart_is_rejected(pool: PgPool) {
    let user = insert_user(&pool, "c@example.com").await.unwrap();

    let err = service(&pool).place_order(user, &request()).await.unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(count_rows(&pool, "addresses").await.unwrap(), 0);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_two_buyers_for_last_copy(pool: PgPool) {
    let book = insert_book(&pool, "Last Copy", 2500, 1).await.unwrap();
    let first = insert_user(&pool, "d1@example.com").await.unwrap();
    let second = insert_user(&pool, "d2@example.com").await.unwrap();
    let cart = CartRepository::new(&pool);
    cart.add(first, book, qty(1)).await.unwrap();
    cart.add(second, book, qty(1)).await.unwrap();

    let service = Arc::new(service(&pool));
    let handles: Vec<_> = [first, second]
        .into_iter()
        .map(|user| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.place_order(user, &request()).await })
        })
        .collect();

    let mut placed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(CheckoutError::InsufficientStock { available: 0, .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!((placed, rejected), (1, 1));
    assert_eq!(stock_of(&pool, book).await.unwrap(), 0);
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 1);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_idempotency_key_replays_order(pool: PgPool) {
    let user = insert_user(&pool, "e@example.com").await.unwrap();
    let book = insert_book(&pool, "Once", 1200, 5).await.unwrap();
    CartRepository::new(&pool)
        .add(user, book, qty(1))
        .await
        .unwrap();

    let request = CheckoutRequest {
        shipping: shipping(),
        idempotency_key: Some(IdempotencyKey::parse("retry-me").unwrap()),
    };
    let service = service(&pool);
    let first = service.place_order(user, &request).await.unwrap();
    let second = service.place_order(user, &request).await.unwrap();

    assert!(second.replayed);
    assert_eq!(first.order_id, second.order_id);
    assert_eq!(first.order_number, second.order_number);
    assert_eq!(count_rows(&pool, "orders").await.unwrap(), 1);
    assert_eq!(stock_of(&pool, book).await.unwrap(), 4);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_unknown_customer(pool: PgPool) {
    let err = service(&pool)
        .place_order(bookshelf_core::UserId::new(4242), &request())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::UnknownCustomer(_)));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_orders_are_scoped_to_their_owner(pool: PgPool) {
    let owner = insert_user(&pool, "f1@example.com").await.unwrap();
    let other = insert_user(&pool, "f2@example.com").await.unwrap();
    let book = insert_book(&pool, "Mine", 800, 3).await.unwrap();
    CartRepository::new(&pool)
        .add(owner, book, qty(1))
        .await
        .unwrap();
    let placed = service(&pool).place_order(owner, &request()).await.unwrap();

    let orders = OrderRepository::new(&pool);
    assert!(
        orders
            .detail_for_user(other, placed.order_id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(orders.list_for_user(other).await.unwrap().is_empty());
    assert_eq!(orders.list_for_user(owner).await.unwrap().len(), 1);

    let shipped = orders
        .update_status(placed.order_id, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert!(shipped.updated_at >= shipped.created_at);
}

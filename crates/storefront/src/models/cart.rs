//! Cart models.

use serde::Serialize;

use bookshelf_core::{BookId, CartItemId, Price, Quantity};

/// One line of a cart snapshot taken inside the checkout transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub id: CartItemId,
    pub book_id: BookId,
    pub quantity: Quantity,
}

/// A cart line joined with the book it refers to.
#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub book_id: BookId,
    pub quantity: Quantity,
    pub title: String,
    pub author: String,
    pub price: Price,
    pub stock_quantity: i32,
    pub subtotal: Price,
}

/// The caller's cart as returned by `GET /api/cart`.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total: Price,
    pub item_count: i64,
}

impl CartView {
    /// Build a view from joined lines, summing subtotals.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the total overflows.
    pub fn from_items(items: Vec<CartItem>) -> Result<Self, bookshelf_core::PriceError> {
        let total = Price::total(items.iter().map(|item| item.subtotal))?;
        let item_count = items
            .iter()
            .map(|item| i64::from(item.quantity.get()))
            .sum();
        Ok(Self {
            items,
            total,
            item_count,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i32, cents: i64, quantity: i32) -> CartItem {
        let price = Price::from_cents(cents).unwrap();
        let quantity = Quantity::new(quantity).unwrap();
        CartItem {
            id: CartItemId::new(id),
            book_id: BookId::new(id),
            quantity,
            title: format!("Book {id}"),
            author: "Anon".to_string(),
            price,
            stock_quantity: 10,
            subtotal: price.times(quantity).unwrap(),
        }
    }

    #[test]
    fn test_view_totals() {
        let view = CartView::from_items(vec![item(1, 1000, 2), item(2, 500, 1)]).unwrap();
        assert_eq!(view.total, Price::from_cents(2500).unwrap());
        assert_eq!(view.item_count, 3);
    }

    #[test]
    fn test_empty_view() {
        let view = CartView::from_items(Vec::new()).unwrap();
        assert_eq!(view.total, Price::ZERO);
        assert_eq!(view.item_count, 0);
    }
}

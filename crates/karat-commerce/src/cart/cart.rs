//! Cart and cart line types.

use crate::catalog::Item;
use crate::error::CommerceError;
use crate::ids::ItemId;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// A session's cart.
///
/// Every mutation checks the resulting quantity against the item's current
/// stock and leaves the cart untouched when the check fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Owning session.
    pub session_id: String,
    /// Lines in the order they were first added.
    pub lines: Vec<CartLine>,
    /// Cart currency.
    pub currency: Currency,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Cart {
    /// Create an empty cart for a session.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            lines: Vec::new(),
            currency: Currency::default(),
            updated_at: current_timestamp(),
        }
    }

    /// Add `quantity` of `item`, merging into an existing line.
    ///
    /// The price is snapshotted on first add; later adds keep that snapshot.
    pub fn add(&mut self, item: &Item, quantity: i64) -> Result<&CartLine, CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        // An empty cart takes the currency of whatever goes in first.
        if self.lines.is_empty() {
            self.currency = item.price.currency;
        } else if item.price.currency != self.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: item.price.currency.code().to_string(),
            });
        }

        let position = self.position(&item.id);
        let current = position.map_or(0, |i| self.lines[i].quantity);
        let wanted = current.checked_add(quantity).ok_or(CommerceError::Overflow)?;
        check_stock(item, wanted)?;

        let index = match position {
            Some(i) => {
                self.lines[i].quantity = wanted;
                i
            }
            None => {
                self.lines.push(CartLine {
                    item_id: item.id.clone(),
                    name: item.name.clone(),
                    price: item.price,
                    quantity: wanted,
                });
                self.lines.len() - 1
            }
        };
        self.updated_at = current_timestamp();
        Ok(&self.lines[index])
    }

    /// Set the quantity of a line. A quantity of zero or less removes it.
    pub fn update_quantity(&mut self, item: &Item, quantity: i64) -> Result<(), CommerceError> {
        let index = self
            .position(&item.id)
            .ok_or_else(|| CommerceError::ItemNotInCart(item.id.to_string()))?;

        if quantity <= 0 {
            self.lines.remove(index);
        } else {
            check_stock(item, quantity)?;
            self.lines[index].quantity = quantity;
        }
        self.updated_at = current_timestamp();
        Ok(())
    }

    /// Remove a line.
    pub fn remove(&mut self, item_id: &ItemId) -> Result<CartLine, CommerceError> {
        let index = self
            .position(item_id)
            .ok_or_else(|| CommerceError::ItemNotInCart(item_id.to_string()))?;
        self.updated_at = current_timestamp();
        Ok(self.lines.remove(index))
    }

    /// Drop every line at once.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.updated_at = current_timestamp();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, item_id: &ItemId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.item_id == item_id)
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of snapshot price times quantity.
    pub fn base_total(&self) -> Result<Money, CommerceError> {
        let subtotals = self
            .lines
            .iter()
            .map(CartLine::subtotal)
            .collect::<Result<Vec<_>, _>>()?;
        Money::try_sum(subtotals.iter(), self.currency).ok_or(CommerceError::Overflow)
    }

    /// Client-facing lines.
    pub fn views(&self) -> Vec<CartLineView> {
        self.lines.iter().map(CartLineView::from).collect()
    }

    fn position(&self, item_id: &ItemId) -> Option<usize> {
        self.lines.iter().position(|l| &l.item_id == item_id)
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new("anonymous")
    }
}

fn check_stock(item: &Item, wanted: i64) -> Result<(), CommerceError> {
    if wanted > item.stock {
        return Err(CommerceError::InsufficientStock {
            item_id: item.id.to_string(),
            requested: wanted,
            available: item.stock,
        });
    }
    Ok(())
}

/// One item in a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub item_id: ItemId,
    /// Item name at add time.
    pub name: String,
    /// Unit price at add time.
    pub price: Money,
    pub quantity: i64,
}

impl CartLine {
    /// Price times quantity.
    pub fn subtotal(&self) -> Result<Money, CommerceError> {
        self.price
            .try_multiply(self.quantity)
            .ok_or(CommerceError::Overflow)
    }
}

/// Cart line as sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLineView {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.item_id.to_string(),
            name: line.name.clone(),
            price: line.price.to_decimal(),
            quantity: line.quantity,
        }
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{CategoryId, MaterialId};
    use chrono::Utc;

    fn item(id: &str, price_minor: i64, stock: i64) -> Item {
        Item {
            id: ItemId::new(id),
            unique_id: id.to_uppercase(),
            name: format!("Item {id}"),
            category_id: CategoryId::new("rings"),
            material_id: MaterialId::new("gold"),
            price: Money::new(price_minor, Currency::INR),
            weight: None,
            stock,
            sold_count: 0,
            description: None,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_creation() {
        let cart = Cart::new("session-123");
        assert!(cart.is_empty());
        assert_eq!(cart.session_id, "session-123");
    }

    #[test]
    fn test_add_merges_lines() {
        let ring = item("a", 10_000, 5);
        let mut cart = Cart::new("s");
        cart.add(&ring, 1).unwrap();
        cart.add(&ring, 2).unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_keeps_first_price_snapshot() {
        let mut ring = item("a", 10_000, 5);
        let mut cart = Cart::new("s");
        cart.add(&ring, 1).unwrap();

        ring.price = Money::new(99_900, Currency::INR);
        cart.add(&ring, 1).unwrap();
        assert_eq!(cart.lines[0].price.amount_minor, 10_000);
    }

    #[test]
    fn test_add_over_stock_leaves_cart_unchanged() {
        let ring = item("a", 10_000, 2);
        let mut cart = Cart::new("s");
        cart.add(&ring, 2).unwrap();
        let before = cart.clone();

        let err = cart.add(&ring, 1).unwrap_err();
        assert!(matches!(
            err,
            CommerceError::InsufficientStock { requested: 3, available: 2, .. }
        ));
        assert_eq!(cart, before);

        let mut empty = Cart::new("s");
        assert!(empty.add(&ring, 3).is_err());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_empty_cart_adopts_item_currency() {
        let mut priced_in_usd = item("a", 10_000, 5);
        priced_in_usd.price = Money::new(10_000, Currency::USD);
        let mut cart = Cart::new("s");
        cart.add(&priced_in_usd, 1).unwrap();
        assert_eq!(cart.currency, Currency::USD);

        assert!(matches!(
            cart.add(&item("b", 100, 5), 1),
            Err(CommerceError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_quantity() {
        let mut cart = Cart::new("s");
        assert!(matches!(
            cart.add(&item("a", 100, 5), 0),
            Err(CommerceError::InvalidQuantity(0))
        ));
    }

    #[test]
    fn test_update_quantity() {
        let ring = item("a", 10_000, 5);
        let mut cart = Cart::new("s");
        cart.add(&ring, 1).unwrap();

        cart.update_quantity(&ring, 4).unwrap();
        assert_eq!(cart.item_count(), 4);

        assert!(cart.update_quantity(&ring, 6).is_err());
        assert_eq!(cart.item_count(), 4);

        cart.update_quantity(&ring, 0).unwrap();
        assert!(cart.is_empty());

        assert!(matches!(
            cart.update_quantity(&ring, 1),
            Err(CommerceError::ItemNotInCart(_))
        ));
    }

    #[test]
    fn test_remove() {
        let ring = item("a", 10_000, 5);
        let mut cart = Cart::new("s");
        cart.add(&ring, 1).unwrap();

        assert_eq!(cart.remove(&ring.id).unwrap().quantity, 1);
        assert!(cart.remove(&ring.id).is_err());
    }

    #[test]
    fn test_base_total() {
        let mut cart = Cart::new("s");
        cart.add(&item("a", 10_000, 5), 2).unwrap();
        cart.add(&item("b", 5_000, 5), 1).unwrap();
        assert_eq!(cart.base_total().unwrap().amount_minor, 25_000);
    }

    #[test]
    fn test_views_use_item_id() {
        let mut cart = Cart::new("s");
        cart.add(&item("a", 12_345, 5), 1).unwrap();
        let views = cart.views();
        assert_eq!(views[0].id, "a");
        assert_eq!(views[0].price, 123.45);
    }
}

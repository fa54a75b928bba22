//! Storage abstraction.
//!
//! Every backend implements [`Store`]. Listing, search and tree logic live
//! above this trait so backends only have to persist records and provide the
//! two atomic operations checkout depends on: [`Store::adjust_stock`] and
//! [`Store::place_order`].

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use crate::catalog::{Category, Item, Material};
use crate::checkout::{Customer, NewCustomer, Order, OrderItem, OrderSummary};
use crate::error::CommerceError;
use crate::ids::{CategoryId, ItemId, MaterialId, OrderId};
use crate::money::Money;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One line of an order to be placed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub quantity: i64,
    /// Unit price snapshot.
    pub price: Money,
}

/// Everything needed to persist an order in one unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewOrder {
    pub customer: NewCustomer,
    pub total_price: Money,
    pub payment_method: String,
    pub lines: Vec<OrderLine>,
}

/// Result of [`Store::place_order`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacedOrder {
    pub order: Order,
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    /// Whether the customer record was created by this order.
    pub customer_created: bool,
}

/// Persistence for the back office.
///
/// Lookups return `Ok(None)`/`Ok(false)` for unknown ids; mapping that to a
/// not-found error is left to the caller, which knows the entity name.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for health output.
    fn backend(&self) -> &'static str;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), CommerceError>;

    /// All categories in insertion order.
    async fn list_categories(&self) -> Result<Vec<Category>, CommerceError>;
    async fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, CommerceError>;
    async fn insert_category(&self, category: &Category) -> Result<(), CommerceError>;
    /// Replace a stored category. Returns false if it does not exist.
    async fn update_category(&self, category: &Category) -> Result<bool, CommerceError>;
    /// Delete every listed category in one operation. Returns the count removed.
    async fn delete_categories(&self, ids: &[CategoryId]) -> Result<u64, CommerceError>;

    async fn list_materials(&self) -> Result<Vec<Material>, CommerceError>;
    async fn get_material(&self, id: &MaterialId) -> Result<Option<Material>, CommerceError>;
    async fn insert_material(&self, material: &Material) -> Result<(), CommerceError>;

    /// All items in insertion order.
    async fn list_items(&self) -> Result<Vec<Item>, CommerceError>;
    async fn get_item(&self, id: &ItemId) -> Result<Option<Item>, CommerceError>;
    /// Insert an item. Fails with a validation error on a duplicate `unique_id`.
    async fn insert_item(&self, item: &Item) -> Result<(), CommerceError>;
    /// Replace a stored item. Returns false if it does not exist.
    async fn update_item(&self, item: &Item) -> Result<bool, CommerceError>;
    async fn delete_item(&self, id: &ItemId) -> Result<bool, CommerceError>;

    /// Atomically move `quantity` units from stock to sold.
    ///
    /// Fails with `InsufficientStock` and changes nothing if stock is short.
    async fn adjust_stock(&self, id: &ItemId, quantity: i64) -> Result<(), CommerceError>;

    /// Resolve the customer, insert the order and its lines, and adjust
    /// stock for every line. Either all of it is persisted or none of it.
    async fn place_order(&self, order: NewOrder) -> Result<PlacedOrder, CommerceError>;

    async fn find_customer_by_contact(
        &self,
        contact: &str,
    ) -> Result<Option<Customer>, CommerceError>;

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, CommerceError>;
    async fn order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, CommerceError>;

    /// Orders joined with their customers, newest first.
    async fn order_history(&self) -> Result<Vec<OrderSummary>, CommerceError>;
}

/// Reject quantities that can't be sold.
pub(crate) fn check_quantity(quantity: i64) -> Result<(), CommerceError> {
    if quantity <= 0 {
        return Err(CommerceError::InvalidQuantity(quantity));
    }
    Ok(())
}

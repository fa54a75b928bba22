//! In-memory store.
//!
//! The whole dataset sits behind one `RwLock`, so every write, including
//! [`Store::place_order`], is atomic with respect to every other operation.

use crate::catalog::{Category, Item, Material};
use crate::checkout::{Customer, Order, OrderItem, OrderStatus, OrderSummary};
use crate::error::CommerceError;
use crate::ids::{CategoryId, ItemId, MaterialId, OrderId, OrderItemId};
use crate::storage::{check_quantity, NewOrder, PlacedOrder, Store};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Dataset {
    categories: Vec<Category>,
    materials: Vec<Material>,
    items: Vec<Item>,
    customers: Vec<Customer>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
}

impl Dataset {
    fn item_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| &i.id == id)
    }

    fn sku_taken(&self, unique_id: &str, except: Option<&ItemId>) -> bool {
        self.items
            .iter()
            .any(|i| i.unique_id == unique_id && Some(&i.id) != except)
    }
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Dataset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_sku(unique_id: &str) -> CommerceError {
    CommerceError::validation(format!("Item with unique_id {unique_id} already exists"))
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), CommerceError> {
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CommerceError> {
        Ok(self.data.read().await.categories.clone())
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, CommerceError> {
        let data = self.data.read().await;
        Ok(data.categories.iter().find(|c| &c.id == id).cloned())
    }

    async fn insert_category(&self, category: &Category) -> Result<(), CommerceError> {
        self.data.write().await.categories.push(category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<bool, CommerceError> {
        let mut data = self.data.write().await;
        match data.categories.iter_mut().find(|c| c.id == category.id) {
            Some(existing) => {
                *existing = category.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_categories(&self, ids: &[CategoryId]) -> Result<u64, CommerceError> {
        let doomed: HashSet<&CategoryId> = ids.iter().collect();
        let mut data = self.data.write().await;
        let before = data.categories.len();
        data.categories.retain(|c| !doomed.contains(&c.id));
        Ok((before - data.categories.len()) as u64)
    }

    async fn list_materials(&self) -> Result<Vec<Material>, CommerceError> {
        Ok(self.data.read().await.materials.clone())
    }

    async fn get_material(&self, id: &MaterialId) -> Result<Option<Material>, CommerceError> {
        let data = self.data.read().await;
        Ok(data.materials.iter().find(|m| &m.id == id).cloned())
    }

    async fn insert_material(&self, material: &Material) -> Result<(), CommerceError> {
        self.data.write().await.materials.push(material.clone());
        Ok(())
    }

    async fn list_items(&self) -> Result<Vec<Item>, CommerceError> {
        Ok(self.data.read().await.items.clone())
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<Item>, CommerceError> {
        let data = self.data.read().await;
        Ok(data.items.iter().find(|i| &i.id == id).cloned())
    }

    async fn insert_item(&self, item: &Item) -> Result<(), CommerceError> {
        let mut data = self.data.write().await;
        if data.sku_taken(&item.unique_id, None) {
            return Err(duplicate_sku(&item.unique_id));
        }
        data.items.push(item.clone());
        Ok(())
    }

    async fn update_item(&self, item: &Item) -> Result<bool, CommerceError> {
        let mut data = self.data.write().await;
        if data.sku_taken(&item.unique_id, Some(&item.id)) {
            return Err(duplicate_sku(&item.unique_id));
        }
        match data.item_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_item(&self, id: &ItemId) -> Result<bool, CommerceError> {
        let mut data = self.data.write().await;
        let before = data.items.len();
        data.items.retain(|i| &i.id != id);
        Ok(data.items.len() < before)
    }

    async fn adjust_stock(&self, id: &ItemId, quantity: i64) -> Result<(), CommerceError> {
        check_quantity(quantity)?;
        let mut data = self.data.write().await;
        let item = data
            .item_mut(id)
            .ok_or_else(|| CommerceError::ItemNotFound(id.to_string()))?;
        if item.stock < quantity {
            return Err(CommerceError::InsufficientStock {
                item_id: id.to_string(),
                requested: quantity,
                available: item.stock,
            });
        }
        item.stock -= quantity;
        item.sold_count += quantity;
        Ok(())
    }

    async fn place_order(&self, order: NewOrder) -> Result<PlacedOrder, CommerceError> {
        let mut data = self.data.write().await;

        // Validate every line before the first write.
        let mut requested: HashMap<&ItemId, i64> = HashMap::new();
        for line in &order.lines {
            check_quantity(line.quantity)?;
            let total = requested.entry(&line.item_id).or_insert(0);
            *total = total.checked_add(line.quantity).ok_or(CommerceError::Overflow)?;
        }
        for (item_id, quantity) in &requested {
            let item = data
                .items
                .iter()
                .find(|i| &i.id == *item_id)
                .ok_or_else(|| CommerceError::ItemNotFound(item_id.to_string()))?;
            if item.stock < *quantity {
                return Err(CommerceError::InsufficientStock {
                    item_id: item_id.to_string(),
                    requested: *quantity,
                    available: item.stock,
                });
            }
        }

        let existing = data
            .customers
            .iter()
            .find(|c| c.contact == order.customer.contact)
            .cloned();
        let customer_created = existing.is_none();
        let customer = match existing {
            Some(customer) => customer,
            None => {
                let customer = order.customer.into_customer();
                data.customers.push(customer.clone());
                customer
            }
        };

        let placed = Order {
            id: OrderId::generate(),
            customer_id: customer.id.clone(),
            total_price: order.total_price,
            payment_method: order.payment_method,
            order_date: Utc::now(),
            status: OrderStatus::Pending,
        };

        let mut items = Vec::with_capacity(order.lines.len());
        for line in order.lines {
            if let Some(item) = data.item_mut(&line.item_id) {
                item.stock -= line.quantity;
                item.sold_count += line.quantity;
            }
            items.push(OrderItem {
                id: OrderItemId::generate(),
                order_id: placed.id.clone(),
                item_id: line.item_id,
                quantity: line.quantity,
                price: line.price,
            });
        }

        data.orders.push(placed.clone());
        data.order_items.extend(items.iter().cloned());

        Ok(PlacedOrder {
            order: placed,
            customer,
            items,
            customer_created,
        })
    }

    async fn find_customer_by_contact(
        &self,
        contact: &str,
    ) -> Result<Option<Customer>, CommerceError> {
        let data = self.data.read().await;
        Ok(data.customers.iter().find(|c| c.contact == contact).cloned())
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, CommerceError> {
        let data = self.data.read().await;
        Ok(data.orders.iter().find(|o| &o.id == id).cloned())
    }

    async fn order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, CommerceError> {
        let data = self.data.read().await;
        Ok(data
            .order_items
            .iter()
            .filter(|i| &i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn order_history(&self) -> Result<Vec<OrderSummary>, CommerceError> {
        let data = self.data.read().await;
        let mut orders: Vec<&Order> = data.orders.iter().collect();
        // Newest first; later inserts win timestamp ties.
        orders.reverse();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));

        Ok(orders
            .into_iter()
            .filter_map(|order| {
                data.customers
                    .iter()
                    .find(|c| c.id == order.customer_id)
                    .map(|customer| OrderSummary::new(order, customer))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::NewCustomer;
    use crate::money::{Currency, Money};
    use crate::storage::OrderLine;

    fn item(sku: &str, stock: i64) -> Item {
        Item {
            id: ItemId::generate(),
            unique_id: sku.into(),
            name: sku.into(),
            category_id: CategoryId::new("c"),
            material_id: MaterialId::new("m"),
            price: Money::new(10_000, Currency::INR),
            weight: None,
            stock,
            sold_count: 0,
            description: None,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    fn customer(contact: &str) -> NewCustomer {
        NewCustomer {
            name: "Ravi".into(),
            contact: contact.into(),
            email: None,
            address: None,
        }
    }

    fn order_for(lines: Vec<(&Item, i64)>, contact: &str) -> NewOrder {
        NewOrder {
            customer: customer(contact),
            total_price: Money::new(1, Currency::INR),
            payment_method: "cash".into(),
            lines: lines
                .into_iter()
                .map(|(item, quantity)| OrderLine {
                    item_id: item.id.clone(),
                    quantity,
                    price: item.price,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let store = MemoryStore::new();
        store.insert_item(&item("R-1", 1)).await.unwrap();
        let err = store.insert_item(&item("R-1", 1)).await.unwrap_err();
        assert!(matches!(err, CommerceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_adjust_stock_is_guarded() {
        let store = MemoryStore::new();
        let ring = item("R-1", 2);
        store.insert_item(&ring).await.unwrap();

        store.adjust_stock(&ring.id, 2).await.unwrap();
        let err = store.adjust_stock(&ring.id, 1).await.unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock { available: 0, .. }));

        let stored = store.get_item(&ring.id).await.unwrap().unwrap();
        assert_eq!((stored.stock, stored.sold_count), (0, 2));
    }

    #[tokio::test]
    async fn test_place_order_all_or_nothing() {
        let store = MemoryStore::new();
        let a = item("A", 5);
        let b = item("B", 1);
        store.insert_item(&a).await.unwrap();
        store.insert_item(&b).await.unwrap();

        let err = store
            .place_order(order_for(vec![(&a, 2), (&b, 3)], "111"))
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock { .. }));

        assert_eq!(store.get_item(&a.id).await.unwrap().unwrap().stock, 5);
        assert!(store.order_history().await.unwrap().is_empty());
        assert!(store.find_customer_by_contact("111").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_place_order_reuses_customer_by_contact() {
        let store = MemoryStore::new();
        let a = item("A", 5);
        store.insert_item(&a).await.unwrap();

        let first = store.place_order(order_for(vec![(&a, 1)], "222")).await.unwrap();
        let second = store.place_order(order_for(vec![(&a, 1)], "222")).await.unwrap();

        assert!(first.customer_created);
        assert!(!second.customer_created);
        assert_eq!(first.customer.id, second.customer.id);
        assert_eq!(store.order_items(&second.order.id).await.unwrap().len(), 1);

        let history = store.order_history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].order_id, second.order.id.to_string());
    }

    #[tokio::test]
    async fn test_delete_categories_only_listed() {
        let store = MemoryStore::new();
        for name in ["a", "b", "c"] {
            store
                .insert_category(&crate::catalog::NewCategory::new(name).into_category())
                .await
                .unwrap();
        }
        let all = store.list_categories().await.unwrap();
        let removed = store
            .delete_categories(&[all[0].id.clone(), all[2].id.clone()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.list_categories().await.unwrap(), vec![all[1].clone()]);
    }
}

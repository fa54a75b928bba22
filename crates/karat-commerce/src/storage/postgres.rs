//! Postgres store.
//!
//! Stock changes are single conditional `UPDATE`s and `place_order` runs in
//! one transaction; dropping the transaction on an early return rolls it back.

use crate::catalog::{Category, Item, Material};
use crate::checkout::{Customer, Order, OrderItem, OrderStatus, OrderSummary};
use crate::error::CommerceError;
use crate::ids::{CategoryId, CustomerId, ItemId, MaterialId, OrderId, OrderItemId};
use crate::money::{Currency, Money, Weight};
use crate::storage::{check_quantity, NewOrder, PlacedOrder, Store};
use async_trait::async_trait;
use chrono::Utc;
use karat_db::Db;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use std::collections::HashMap;

const ITEM_COLUMNS: &str = "id, unique_id, name, category_id, material_id, price_minor, currency, \
     weight_mg, stock, sold_count, description, image_url, created_at";

/// Store backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}

fn currency(code: &str) -> Currency {
    Currency::from_code(code).unwrap_or_default()
}

fn category_from_row(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: CategoryId::new(row.try_get::<String, _>("id")?),
        name: row.try_get("name")?,
        parent_id: row.try_get::<Option<String>, _>("parent_id")?.map(CategoryId::new),
        sort_order: row.try_get("sort_order")?,
        visibility: row.try_get("visibility")?,
        created_at: row.try_get("created_at")?,
    })
}

fn material_from_row(row: &PgRow) -> Result<Material, sqlx::Error> {
    Ok(Material {
        id: MaterialId::new(row.try_get::<String, _>("id")?),
        name: row.try_get("name")?,
    })
}

fn item_from_row(row: &PgRow) -> Result<Item, sqlx::Error> {
    let currency = currency(row.try_get("currency")?);
    Ok(Item {
        id: ItemId::new(row.try_get::<String, _>("id")?),
        unique_id: row.try_get("unique_id")?,
        name: row.try_get("name")?,
        category_id: CategoryId::new(row.try_get::<String, _>("category_id")?),
        material_id: MaterialId::new(row.try_get::<String, _>("material_id")?),
        price: Money::new(row.try_get("price_minor")?, currency),
        weight: row
            .try_get::<Option<i64>, _>("weight_mg")?
            .map(Weight::from_milligrams),
        stock: row.try_get("stock")?,
        sold_count: row.try_get("sold_count")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        created_at: row.try_get("created_at")?,
    })
}

fn customer_from_row(row: &PgRow) -> Result<Customer, sqlx::Error> {
    Ok(Customer {
        id: CustomerId::new(row.try_get::<String, _>("id")?),
        name: row.try_get("name")?,
        contact: row.try_get("contact")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::new(row.try_get::<String, _>("id")?),
        customer_id: CustomerId::new(row.try_get::<String, _>("customer_id")?),
        total_price: Money::new(row.try_get("total_minor")?, currency(row.try_get("currency")?)),
        payment_method: row.try_get("payment_method")?,
        order_date: row.try_get("order_date")?,
        status: OrderStatus::parse(&status).unwrap_or_default(),
    })
}

fn order_item_from_row(row: &PgRow) -> Result<OrderItem, sqlx::Error> {
    Ok(OrderItem {
        id: OrderItemId::new(row.try_get::<String, _>("id")?),
        order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
        item_id: ItemId::new(row.try_get::<String, _>("item_id")?),
        quantity: row.try_get("quantity")?,
        price: Money::new(row.try_get("price_minor")?, currency(row.try_get("currency")?)),
    })
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == "23505")
}

fn map_item_write(e: sqlx::Error, unique_id: &str) -> CommerceError {
    if is_unique_violation(&e) {
        CommerceError::validation(format!("Item with unique_id {unique_id} already exists"))
    } else {
        e.into()
    }
}

/// Conditional decrement. False when the stock guard did not match.
async fn take_stock<'c, E>(executor: E, id: &ItemId, quantity: i64) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    let result = sqlx::query(
        "UPDATE items SET stock = stock - $1, sold_count = sold_count + $1 \
         WHERE id = $2 AND stock >= $1",
    )
    .bind(quantity)
    .bind(id.as_str())
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

async fn shortfall<'c, E>(executor: E, id: &ItemId, quantity: i64) -> CommerceError
where
    E: PgExecutor<'c>,
{
    let stock: Result<Option<i64>, sqlx::Error> =
        sqlx::query_scalar("SELECT stock FROM items WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(executor)
            .await;
    match stock {
        Ok(Some(available)) => CommerceError::InsufficientStock {
            item_id: id.to_string(),
            requested: quantity,
            available,
        },
        Ok(None) => CommerceError::ItemNotFound(id.to_string()),
        Err(e) => e.into(),
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), CommerceError> {
        Ok(self.db.ping().await?)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CommerceError> {
        let rows = sqlx::query(
            "SELECT id, name, parent_id, sort_order, visibility, created_at \
             FROM categories ORDER BY seq",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(category_from_row).collect::<Result<_, _>>()?)
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, CommerceError> {
        let row = sqlx::query(
            "SELECT id, name, parent_id, sort_order, visibility, created_at \
             FROM categories WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(category_from_row).transpose()?)
    }

    async fn insert_category(&self, category: &Category) -> Result<(), CommerceError> {
        sqlx::query(
            "INSERT INTO categories (id, name, parent_id, sort_order, visibility, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(category.id.as_str())
        .bind(&category.name)
        .bind(category.parent_id.as_ref().map(|p| p.as_str()))
        .bind(category.sort_order)
        .bind(category.visibility)
        .bind(category.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<bool, CommerceError> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, parent_id = $3, sort_order = $4, visibility = $5 \
             WHERE id = $1",
        )
        .bind(category.id.as_str())
        .bind(&category.name)
        .bind(category.parent_id.as_ref().map(|p| p.as_str()))
        .bind(category.sort_order)
        .bind(category.visibility)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_categories(&self, ids: &[CategoryId]) -> Result<u64, CommerceError> {
        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let result = sqlx::query("DELETE FROM categories WHERE id = ANY($1)")
            .bind(&ids)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_materials(&self) -> Result<Vec<Material>, CommerceError> {
        let rows = sqlx::query("SELECT id, name FROM materials ORDER BY seq")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(material_from_row).collect::<Result<_, _>>()?)
    }

    async fn get_material(&self, id: &MaterialId) -> Result<Option<Material>, CommerceError> {
        let row = sqlx::query("SELECT id, name FROM materials WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(material_from_row).transpose()?)
    }

    async fn insert_material(&self, material: &Material) -> Result<(), CommerceError> {
        sqlx::query("INSERT INTO materials (id, name) VALUES ($1, $2)")
            .bind(material.id.as_str())
            .bind(&material.name)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn list_items(&self) -> Result<Vec<Item>, CommerceError> {
        let rows = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY seq"))
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(item_from_row).collect::<Result<_, _>>()?)
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<Item>, CommerceError> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(item_from_row).transpose()?)
    }

    async fn insert_item(&self, item: &Item) -> Result<(), CommerceError> {
        sqlx::query(&format!(
            "INSERT INTO items ({ITEM_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(item.id.as_str())
        .bind(&item.unique_id)
        .bind(&item.name)
        .bind(item.category_id.as_str())
        .bind(item.material_id.as_str())
        .bind(item.price.amount_minor)
        .bind(item.price.currency.code())
        .bind(item.weight.map(|w| w.milligrams))
        .bind(item.stock)
        .bind(item.sold_count)
        .bind(&item.description)
        .bind(&item.image_url)
        .bind(item.created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| map_item_write(e, &item.unique_id))?;
        Ok(())
    }

    async fn update_item(&self, item: &Item) -> Result<bool, CommerceError> {
        // sold_count is owned by checkout and never overwritten here.
        let result = sqlx::query(
            "UPDATE items SET unique_id = $2, name = $3, category_id = $4, material_id = $5, \
             price_minor = $6, currency = $7, weight_mg = $8, stock = $9, description = $10, \
             image_url = $11 WHERE id = $1",
        )
        .bind(item.id.as_str())
        .bind(&item.unique_id)
        .bind(&item.name)
        .bind(item.category_id.as_str())
        .bind(item.material_id.as_str())
        .bind(item.price.amount_minor)
        .bind(item.price.currency.code())
        .bind(item.weight.map(|w| w.milligrams))
        .bind(item.stock)
        .bind(&item.description)
        .bind(&item.image_url)
        .execute(self.db.pool())
        .await
        .map_err(|e| map_item_write(e, &item.unique_id))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_item(&self, id: &ItemId) -> Result<bool, CommerceError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id.as_str())
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn adjust_stock(&self, id: &ItemId, quantity: i64) -> Result<(), CommerceError> {
        check_quantity(quantity)?;
        if take_stock(self.db.pool(), id, quantity).await? {
            return Ok(());
        }
        Err(shortfall(self.db.pool(), id, quantity).await)
    }

    async fn place_order(&self, order: NewOrder) -> Result<PlacedOrder, CommerceError> {
        let mut requested: Vec<(ItemId, i64)> = Vec::new();
        let mut positions: HashMap<ItemId, usize> = HashMap::new();
        for line in &order.lines {
            check_quantity(line.quantity)?;
            match positions.get(&line.item_id) {
                Some(&i) => {
                    requested[i].1 = requested[i]
                        .1
                        .checked_add(line.quantity)
                        .ok_or(CommerceError::Overflow)?;
                }
                None => {
                    positions.insert(line.item_id.clone(), requested.len());
                    requested.push((line.item_id.clone(), line.quantity));
                }
            }
        }

        let mut tx = self.db.begin().await?;

        let new_customer = order.customer.into_customer();
        let inserted = sqlx::query(
            "INSERT INTO customers (id, name, contact, email, address, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (contact) DO NOTHING",
        )
        .bind(new_customer.id.as_str())
        .bind(&new_customer.name)
        .bind(&new_customer.contact)
        .bind(&new_customer.email)
        .bind(&new_customer.address)
        .bind(new_customer.created_at)
        .execute(&mut *tx)
        .await?;
        let customer_created = inserted.rows_affected() == 1;

        let row = sqlx::query(
            "SELECT id, name, contact, email, address, created_at FROM customers WHERE contact = $1",
        )
        .bind(&new_customer.contact)
        .fetch_one(&mut *tx)
        .await?;
        let customer = customer_from_row(&row)?;

        let placed = Order {
            id: OrderId::generate(),
            customer_id: customer.id.clone(),
            total_price: order.total_price,
            payment_method: order.payment_method,
            order_date: Utc::now(),
            status: OrderStatus::Pending,
        };
        sqlx::query(
            "INSERT INTO orders (id, customer_id, total_minor, currency, payment_method, order_date, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(placed.id.as_str())
        .bind(placed.customer_id.as_str())
        .bind(placed.total_price.amount_minor)
        .bind(placed.total_price.currency.code())
        .bind(&placed.payment_method)
        .bind(placed.order_date)
        .bind(placed.status.as_str())
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(order.lines.len());
        for line in order.lines {
            let order_item = OrderItem {
                id: OrderItemId::generate(),
                order_id: placed.id.clone(),
                item_id: line.item_id,
                quantity: line.quantity,
                price: line.price,
            };
            sqlx::query(
                "INSERT INTO order_items (id, order_id, item_id, quantity, price_minor, currency) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(order_item.id.as_str())
            .bind(order_item.order_id.as_str())
            .bind(order_item.item_id.as_str())
            .bind(order_item.quantity)
            .bind(order_item.price.amount_minor)
            .bind(order_item.price.currency.code())
            .execute(&mut *tx)
            .await?;
            items.push(order_item);
        }

        for (item_id, quantity) in &requested {
            if !take_stock(&mut *tx, item_id, *quantity).await? {
                return Err(shortfall(&mut *tx, item_id, *quantity).await);
            }
        }

        tx.commit().await?;

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
        let row = sqlx::query(
            "SELECT id, name, contact, email, address, created_at FROM customers WHERE contact = $1",
        )
        .bind(contact)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(customer_from_row).transpose()?)
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, CommerceError> {
        let row = sqlx::query(
            "SELECT id, customer_id, total_minor, currency, payment_method, order_date, status \
             FROM orders WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(order_from_row).transpose()?)
    }

    async fn order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, CommerceError> {
        let rows = sqlx::query(
            "SELECT id, order_id, item_id, quantity, price_minor, currency \
             FROM order_items WHERE order_id = $1",
        )
        .bind(order_id.as_str())
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(order_item_from_row).collect::<Result<_, _>>()?)
    }

    async fn order_history(&self) -> Result<Vec<OrderSummary>, CommerceError> {
        let rows = sqlx::query(
            "SELECT o.id, o.customer_id, o.total_minor, o.currency, o.payment_method, \
                    o.order_date, o.status, \
                    c.id AS c_id, c.name AS c_name, c.contact AS c_contact, \
                    c.email AS c_email, c.address AS c_address, c.created_at AS c_created_at \
             FROM orders o JOIN customers c ON c.id = o.customer_id \
             ORDER BY o.order_date DESC",
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| -> Result<OrderSummary, CommerceError> {
                let order = order_from_row(row)?;
                let customer = Customer {
                    id: CustomerId::new(row.try_get::<String, _>("c_id")?),
                    name: row.try_get("c_name")?,
                    contact: row.try_get("c_contact")?,
                    email: row.try_get("c_email")?,
                    address: row.try_get("c_address")?,
                    created_at: row.try_get("c_created_at")?,
                };
                Ok(OrderSummary::new(&order, &customer))
            })
            .collect()
    }
}

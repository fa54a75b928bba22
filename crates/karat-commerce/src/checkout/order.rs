//! Customer and order records.

use crate::ids::{CustomerId, ItemId, OrderId, OrderItemId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, awaiting processing.
    #[default]
    Pending,
    /// Payment received.
    Paid,
    /// Order cancelled.
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// A customer, deduplicated by contact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Phone number or similar; unique across customers.
    pub contact: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Customer details supplied at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCustomer {
    pub name: String,
    pub contact: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl NewCustomer {
    pub fn into_customer(self) -> Customer {
        Customer {
            id: CustomerId::generate(),
            name: self.name,
            contact: self.contact,
            email: self.email,
            address: self.address,
            created_at: Utc::now(),
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    /// Final total including making charges and metal cost.
    pub total_price: Money,
    pub payment_method: String,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
}

/// One purchased line, with the price snapshot taken at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub item_id: ItemId,
    pub quantity: i64,
    /// Unit price at the time of sale.
    pub price: Money,
}

/// An order joined with its customer, as listed in order history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    pub order_id: String,
    pub customer_id: String,
    pub total_price: f64,
    pub order_date: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_contact: String,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
}

impl OrderSummary {
    pub fn new(order: &Order, customer: &Customer) -> Self {
        Self {
            order_id: order.id.to_string(),
            customer_id: customer.id.to_string(),
            total_price: order.total_price.to_decimal(),
            order_date: order.order_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            payment_method: order.payment_method.clone(),
            status: order.status,
            customer_name: customer.name.clone(),
            customer_contact: customer.contact.clone(),
            customer_email: customer.email.clone(),
            customer_address: customer.address.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use chrono::TimeZone;

    #[test]
    fn test_status_round_trip() {
        assert_eq!(OrderStatus::parse("PENDING"), Some(OrderStatus::Pending));
        assert_eq!(OrderStatus::default().as_str(), "pending");
        assert_eq!(serde_json::to_string(&OrderStatus::Paid).unwrap(), "\"paid\"");
    }

    #[test]
    fn test_summary_formats_date_and_total() {
        let customer = NewCustomer {
            name: "Asha".into(),
            contact: "98450".into(),
            email: None,
            address: Some("Jayanagar".into()),
        }
        .into_customer();
        let order = Order {
            id: OrderId::new("o1"),
            customer_id: customer.id.clone(),
            total_price: Money::new(3_027_000, Currency::INR),
            payment_method: "cash".into(),
            order_date: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
            status: OrderStatus::Pending,
        };

        let summary = OrderSummary::new(&order, &customer);
        assert_eq!(summary.order_date, "2024-03-09 14:05:00");
        assert_eq!(summary.total_price, 30270.0);
        assert_eq!(summary.customer_address.as_deref(), Some("Jayanagar"));
    }
}

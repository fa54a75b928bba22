//! Plain-text receipts, stored per order.

use crate::cart::{CartLine, CheckoutTotals};
use crate::error::CommerceError;
use crate::ids::OrderId;
use crate::money::Money;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// One purchased line as printed on a receipt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i64,
    /// Unit price snapshot.
    pub price: Money,
}

impl From<&CartLine> for ReceiptLine {
    fn from(line: &CartLine) -> Self {
        Self {
            name: line.name.clone(),
            quantity: line.quantity,
            price: line.price,
        }
    }
}

/// Everything printed on a bill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    pub order_id: OrderId,
    pub order_date: DateTime<Utc>,
    pub customer_name: String,
    pub customer_contact: String,
    pub totals: CheckoutTotals,
    pub lines: Vec<ReceiptLine>,
}

impl Receipt {
    /// Render the bill as text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "Bill for Order #{}", self.order_id);
        let _ = writeln!(out, "Date: {}", self.order_date.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Customer: {}", self.customer_name);
        let _ = writeln!(out, "Contact: {}", self.customer_contact);
        let _ = writeln!(out);
        let _ = writeln!(out, "Base Total: {}", self.totals.base_total.display());
        let _ = writeln!(out, "Making Charges: {}", self.totals.making_charges.display());
        let _ = writeln!(out, "Metal Cost: {}", self.totals.metal_cost.display());
        let _ = writeln!(out, "Final Total: {}", self.totals.final_total.display());
        let _ = writeln!(out);
        for line in &self.lines {
            let _ = writeln!(
                out,
                "{} - {} pcs - {}",
                line.name,
                line.quantity,
                line.price.display()
            );
        }
        out
    }
}

/// File name a receipt is stored under.
pub fn receipt_file_name(order_id: &OrderId) -> String {
    format!("order_{order_id}.txt")
}

/// Storage for rendered receipts, addressable by order id.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn save(&self, order_id: &OrderId, contents: &str) -> Result<(), CommerceError>;

    /// Fails with `ReceiptNotFound` when nothing was saved for the order.
    async fn load(&self, order_id: &OrderId) -> Result<String, CommerceError>;
}

/// One file per order under a directory.
#[derive(Debug, Clone)]
pub struct FsReceiptStore {
    dir: PathBuf,
}

impl FsReceiptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, order_id: &OrderId) -> Result<PathBuf, CommerceError> {
        let raw = order_id.as_str();
        let safe = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(CommerceError::validation(format!("Invalid order_id: {raw}")));
        }
        Ok(self.dir.join(receipt_file_name(order_id)))
    }
}

#[async_trait]
impl ReceiptStore for FsReceiptStore {
    async fn save(&self, order_id: &OrderId, contents: &str) -> Result<(), CommerceError> {
        let path = self.path_for(order_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, contents).await?;
        tracing::debug!(path = %path.display(), "receipt written");
        Ok(())
    }

    async fn load(&self, order_id: &OrderId) -> Result<String, CommerceError> {
        let path = self.path_for(order_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CommerceError::ReceiptNotFound(order_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Receipts kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryReceiptStore {
    receipts: RwLock<HashMap<OrderId, String>>,
}

impl MemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReceiptStore for MemoryReceiptStore {
    async fn save(&self, order_id: &OrderId, contents: &str) -> Result<(), CommerceError> {
        self.receipts
            .write()
            .await
            .insert(order_id.clone(), contents.to_string());
        Ok(())
    }

    async fn load(&self, order_id: &OrderId) -> Result<String, CommerceError> {
        self.receipts
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| CommerceError::ReceiptNotFound(order_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use chrono::TimeZone;

    fn inr(amount: f64) -> Money {
        Money::from_decimal(amount, Currency::INR)
    }

    fn receipt() -> Receipt {
        Receipt {
            order_id: OrderId::new("abc123"),
            order_date: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
            customer_name: "Meera".into(),
            customer_contact: "9000000001".into(),
            totals: CheckoutTotals::new(inr(250.0), inr(20.0), inr(30_000.0)).unwrap(),
            lines: vec![
                ReceiptLine {
                    name: "Anklet".into(),
                    quantity: 2,
                    price: inr(100.0),
                },
                ReceiptLine {
                    name: "Gold Stud".into(),
                    quantity: 1,
                    price: inr(50.0),
                },
            ],
        }
    }

    #[test]
    fn test_render_layout() {
        let text = receipt().render();
        assert!(text.starts_with("Bill for Order #abc123\n"));
        assert!(text.contains("Date: 2024-03-09 14:05:00"));
        assert!(text.contains("Making Charges: ₹20.00"));
        assert!(text.contains("Final Total: ₹30270.00"));
        assert!(text.contains("Anklet - 2 pcs - ₹100.00"));
        assert!(text.ends_with("Gold Stud - 1 pcs - ₹50.00\n"));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryReceiptStore::new();
        let id = OrderId::new("o1");
        assert!(store.load(&id).await.unwrap_err().is_not_found());
        store.save(&id, "bill").await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), "bill");
    }

    #[tokio::test]
    async fn test_fs_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("karat-receipts-{}", OrderId::generate()));
        let store = FsReceiptStore::new(&dir);
        let id = OrderId::new("o1");

        store.save(&id, "bill text").await.unwrap();
        assert!(dir.join("order_o1.txt").exists());
        assert_eq!(store.load(&id).await.unwrap(), "bill text");
        assert!(store
            .load(&OrderId::new("missing"))
            .await
            .unwrap_err()
            .is_not_found());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_fs_store_rejects_path_tricks() {
        let store = FsReceiptStore::new(std::env::temp_dir());
        let err = store.load(&OrderId::new("../etc/passwd")).await.unwrap_err();
        assert!(matches!(err, CommerceError::ValidationError(_)));
    }
}

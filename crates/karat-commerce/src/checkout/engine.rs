//! Order placement.
//!
//! A checkout prices the cart (snapshot prices, making charges, metal
//! surcharge at spot rates), persists customer, order, lines and stock
//! changes through one [`Store::place_order`] call, writes the receipt, and
//! finally clears the cart.

use crate::cart::{metal_surcharge, Cart, CheckoutTotals, MetalLine};
use crate::catalog::{CatalogService, FieldValue};
use crate::checkout::{NewCustomer, Order, Receipt, ReceiptLine, ReceiptStore};
use crate::error::CommerceError;
use crate::events::ChangeEvent;
use crate::metal::MetalPriceFeed;
use crate::money::Money;
use crate::storage::{NewOrder, OrderLine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Payment method recorded when the client sends none.
pub const DEFAULT_PAYMENT_METHOD: &str = "cash";

/// Checkout input from the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_contact: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Flat labour fee; absent or blank means zero.
    #[serde(default)]
    pub making_charges: Option<FieldValue>,
}

impl CheckoutRequest {
    fn customer(&self) -> Result<NewCustomer, CommerceError> {
        let name = trimmed(&self.customer_name)
            .ok_or_else(|| CommerceError::validation("Missing required field: customer_name"))?;
        let contact = trimmed(&self.customer_contact).ok_or_else(|| {
            CommerceError::validation("Missing required field: customer_contact")
        })?;
        Ok(NewCustomer {
            name,
            contact,
            email: trimmed(&self.email),
            address: trimmed(&self.address),
        })
    }

    fn payment_method(&self) -> String {
        trimmed(&self.payment_method).unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string())
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub totals: CheckoutTotals,
    pub receipt: Receipt,
    /// Rendered receipt text, as stored.
    pub receipt_text: String,
}

/// Runs checkouts against the catalog store.
#[derive(Clone)]
pub struct CheckoutEngine {
    catalog: CatalogService,
    prices: Arc<dyn MetalPriceFeed>,
    receipts: Arc<dyn ReceiptStore>,
}

impl std::fmt::Debug for CheckoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutEngine")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl CheckoutEngine {
    pub fn new(
        catalog: CatalogService,
        prices: Arc<dyn MetalPriceFeed>,
        receipts: Arc<dyn ReceiptStore>,
    ) -> Self {
        Self {
            catalog,
            prices,
            receipts,
        }
    }

    pub fn receipts(&self) -> &Arc<dyn ReceiptStore> {
        &self.receipts
    }

    /// Price the cart without placing anything.
    pub async fn quote(
        &self,
        cart: &Cart,
        making_charges: Option<&FieldValue>,
    ) -> Result<CheckoutTotals, CommerceError> {
        let currency = cart.currency;
        let making = match making_charges {
            Some(value) => value.to_money(currency, "making_charges")?,
            None => None,
        }
        .unwrap_or_else(|| Money::zero(currency));

        let base = cart.base_total()?;
        let metal = self.metal_cost(cart).await?;
        CheckoutTotals::new(base, making, metal)
    }

    /// Place an order for everything in `cart`.
    ///
    /// Nothing is persisted unless pricing succeeds, and order, lines and
    /// stock changes land together. The cart is cleared only after the order
    /// is stored. A receipt that fails to save is logged; the order stands
    /// and the rendered text is still returned.
    pub async fn place_order(
        &self,
        cart: &mut Cart,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, CommerceError> {
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        let customer = request.customer()?;
        let totals = self.quote(cart, request.making_charges.as_ref()).await?;

        let placed = self
            .catalog
            .store()
            .place_order(NewOrder {
                customer,
                total_price: totals.final_total,
                payment_method: request.payment_method(),
                lines: cart
                    .lines
                    .iter()
                    .map(|l| OrderLine {
                        item_id: l.item_id.clone(),
                        quantity: l.quantity,
                        price: l.price,
                    })
                    .collect(),
            })
            .await?;

        info!(
            order_id = %placed.order.id,
            customer_id = %placed.customer.id,
            new_customer = placed.customer_created,
            lines = placed.items.len(),
            total = %placed.order.total_price.display_amount(),
            "order placed"
        );

        let receipt = Receipt {
            order_id: placed.order.id.clone(),
            order_date: placed.order.order_date,
            customer_name: placed.customer.name.clone(),
            customer_contact: placed.customer.contact.clone(),
            totals,
            lines: cart.lines.iter().map(ReceiptLine::from).collect(),
        };
        let receipt_text = receipt.render();
        if let Err(e) = self.receipts.save(&placed.order.id, &receipt_text).await {
            error!(order_id = %placed.order.id, error = %e, "failed to store receipt");
        }

        cart.clear();
        self.catalog.events().publish(ChangeEvent::CartUpdated {
            session: cart.session_id.clone(),
            lines: Vec::new(),
        });
        self.catalog.broadcast_items().await;

        Ok(CheckoutOutcome {
            order: placed.order,
            totals,
            receipt,
            receipt_text,
        })
    }

    /// Metal surcharge for the cart at current rates.
    ///
    /// Rates are only fetched when some line is made of a priced metal and
    /// has a weight.
    async fn metal_cost(&self, cart: &Cart) -> Result<Money, CommerceError> {
        let mut lines = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let item = self.catalog.get_item(&line.item_id).await?;
            let metal = match self.catalog.store().get_material(&item.material_id).await? {
                Some(material) => material.metal(),
                None => None,
            };
            lines.push(MetalLine {
                metal,
                weight: item.weight,
                quantity: line.quantity,
            });
        }

        if !lines.iter().any(|l| l.metal.is_some() && l.weight.is_some()) {
            return Ok(Money::zero(cart.currency));
        }
        let rates = self.prices.metal_prices().await;
        metal_surcharge(lines, &rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, Item, Material, NewCategory, NewItem, NewMaterial};
    use crate::checkout::MemoryReceiptStore;
    use crate::events::EventBus;
    use crate::metal::FixedPrices;
    use crate::money::Currency;
    use crate::storage::MemoryStore;

    struct Fixture {
        engine: CheckoutEngine,
        catalog: CatalogService,
        receipts: Arc<MemoryReceiptStore>,
        category: Category,
        gold: Material,
        resin: Material,
    }

    async fn fixture() -> Fixture {
        let catalog = CatalogService::new(Arc::new(MemoryStore::new()), EventBus::new(32));
        let receipts = Arc::new(MemoryReceiptStore::new());
        let engine = CheckoutEngine::new(
            catalog.clone(),
            Arc::new(FixedPrices::per_gram(6000.0, 80.0, Currency::INR)),
            receipts.clone(),
        );
        let category = catalog.add_category(NewCategory::new("Rings")).await.unwrap();
        let gold = catalog.add_material(NewMaterial::new("Gold")).await.unwrap();
        let resin = catalog.add_material(NewMaterial::new("Resin")).await.unwrap();
        Fixture {
            engine,
            catalog,
            receipts,
            category,
            gold,
            resin,
        }
    }

    impl Fixture {
        async fn item(&self, sku: &str, material: &Material, price: &str, weight: Option<&str>, stock: i64) -> Item {
            self.catalog
                .add_item(NewItem {
                    unique_id: Some(sku.into()),
                    name: Some(sku.into()),
                    category_id: Some(self.category.id.clone()),
                    material_id: Some(material.id.clone()),
                    price: Some(FieldValue::from(price)),
                    weight: weight.map(FieldValue::from),
                    stock: Some(FieldValue::from(stock)),
                    ..Default::default()
                })
                .await
                .unwrap()
        }
    }

    fn request(making: Option<FieldValue>) -> CheckoutRequest {
        CheckoutRequest {
            customer_name: Some("Meera".into()),
            customer_contact: Some("9000000001".into()),
            making_charges: making,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_worked_example_totals() {
        let fx = fixture().await;
        let a = fx.item("A", &fx.resin, "100", None, 5).await;
        let b = fx.item("B", &fx.gold, "50", Some("5"), 5).await;

        let mut cart = Cart::new("s1");
        cart.add(&a, 2).unwrap();
        cart.add(&b, 1).unwrap();

        let outcome = fx
            .engine
            .place_order(&mut cart, request(Some(FieldValue::from(20))))
            .await
            .unwrap();

        let view = outcome.totals.to_view();
        assert_eq!(view.base_total, 250.0);
        assert_eq!(view.metal_cost, 30_000.0);
        assert_eq!(view.final_total, 30_270.0);
        assert_eq!(outcome.order.total_price, outcome.totals.final_total);
    }

    #[tokio::test]
    async fn test_checkout_effects() {
        let fx = fixture().await;
        let a = fx.item("A", &fx.resin, "100", None, 5).await;
        let b = fx.item("B", &fx.gold, "50", Some("2.5"), 3).await;
        let mut events = fx.catalog.events().subscribe();

        let mut cart = Cart::new("s1");
        cart.add(&a, 2).unwrap();
        cart.add(&b, 3).unwrap();

        let outcome = fx.engine.place_order(&mut cart, request(None)).await.unwrap();
        assert!(cart.is_empty());

        let store = fx.catalog.store();
        let a_after = store.get_item(&a.id).await.unwrap().unwrap();
        let b_after = store.get_item(&b.id).await.unwrap().unwrap();
        assert_eq!((a_after.stock, a_after.sold_count), (3, 2));
        assert_eq!((b_after.stock, b_after.sold_count), (0, 3));

        let history = store.order_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].payment_method, DEFAULT_PAYMENT_METHOD);
        assert_eq!(store.order_items(&outcome.order.id).await.unwrap().len(), 2);

        let saved = fx.receipts.load(&outcome.order.id).await.unwrap();
        assert_eq!(saved, outcome.receipt_text);
        assert!(saved.contains("A - 2 pcs - ₹100.00"));

        match events.recv().await.unwrap() {
            ChangeEvent::CartUpdated { session, lines } => {
                assert_eq!(session, "s1");
                assert!(lines.is_empty());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(events.recv().await.unwrap(), ChangeEvent::ItemsUpdated(_)));
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let fx = fixture().await;
        let mut cart = Cart::new("s1");
        let err = fx.engine.place_order(&mut cart, request(None)).await.unwrap_err();
        assert!(matches!(err, CommerceError::EmptyCart));
    }

    #[tokio::test]
    async fn test_missing_customer_leaves_everything_untouched() {
        let fx = fixture().await;
        let a = fx.item("A", &fx.resin, "100", None, 5).await;
        let mut cart = Cart::new("s1");
        cart.add(&a, 1).unwrap();

        let err = fx
            .engine
            .place_order(&mut cart, CheckoutRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::ValidationError(_)));
        assert_eq!(cart.item_count(), 1);
        assert!(fx.catalog.store().order_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stock_sold_elsewhere_aborts_checkout() {
        let fx = fixture().await;
        let a = fx.item("A", &fx.resin, "100", None, 2).await;
        let mut cart = Cart::new("s1");
        cart.add(&a, 2).unwrap();

        fx.catalog.store().adjust_stock(&a.id, 1).await.unwrap();

        let err = fx.engine.place_order(&mut cart, request(None)).await.unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock { .. }));
        assert_eq!(cart.item_count(), 2);
        assert!(fx.catalog.store().order_history().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_never_oversell() {
        let fx = fixture().await;
        let a = fx.item("A", &fx.resin, "100", None, 5).await;

        let mut tasks = Vec::new();
        for n in 0..20 {
            let engine = fx.engine.clone();
            let item = a.clone();
            tasks.push(tokio::spawn(async move {
                let mut cart = Cart::new(format!("s{n}"));
                cart.add(&item, 1).unwrap();
                engine.place_order(&mut cart, request(None)).await
            }));
        }

        let mut placed = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => placed += 1,
                Err(err) => assert!(matches!(err, CommerceError::InsufficientStock { .. })),
            }
        }

        let store = fx.catalog.store();
        let after = store.get_item(&a.id).await.unwrap().unwrap();
        assert_eq!(placed, 5);
        assert_eq!((after.stock, after.sold_count), (0, 5));
        assert_eq!(store.order_history().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_quote_skips_rates_without_metal_lines() {
        let fx = fixture().await;
        let a = fx.item("A", &fx.gold, "100", None, 2).await;
        let mut cart = Cart::new("s1");
        cart.add(&a, 1).unwrap();

        let totals = fx
            .engine
            .quote(&cart, Some(&FieldValue::from("")))
            .await
            .unwrap();
        assert!(totals.metal_cost.is_zero());
        assert!(totals.making_charges.is_zero());
        assert_eq!(totals.final_total.amount_minor, 10_000);
    }
}

//! Jewelry retail back-office domain for karat.
//!
//! - **Catalog**: category hierarchy, materials, items, and the service that
//!   applies catalog writes
//! - **Cart**: per-session cart with price snapshots and stock checks
//! - **Checkout**: pricing against metal spot rates, order placement, receipts
//! - **Search**: listing sort orders and text filters
//! - **Storage**: the [`storage::Store`] trait with in-memory and Postgres backends
//!
//! # Example
//!
//! ```rust,ignore
//! use karat_commerce::prelude::*;
//! use std::sync::Arc;
//!
//! let catalog = CatalogService::new(Arc::new(MemoryStore::new()), EventBus::default());
//! let engine = CheckoutEngine::new(
//!     catalog.clone(),
//!     Arc::new(SpotPriceFeed::new(SpotPriceConfig::default())),
//!     Arc::new(FsReceiptStore::new("bills")),
//! );
//!
//! let ring = catalog.get_item(&item_id).await?;
//! let mut cart = Cart::new(session_id);
//! cart.add(&ring, 1)?;
//!
//! let outcome = engine.place_order(&mut cart, request).await?;
//! println!("Total: {}", outcome.totals.final_total.display());
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod events;
pub mod metal;
pub mod search;
pub mod storage;

pub use error::{CommerceError, ErrorKind};
pub use ids::*;
pub use money::{Currency, Money, Weight};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{CommerceError, ErrorKind};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money, Weight};

    // Catalog
    pub use crate::catalog::{
        CatalogService, Category, CategoryNode, CategoryPatch, FieldValue, Item, ItemDetail,
        ItemPatch, ItemSuggestion, ItemView, Material, Metal, NewCategory, NewItem, NewMaterial,
    };

    // Cart
    pub use crate::cart::{Cart, CartLine, CartLineView, CheckoutTotals, TotalsView};

    // Checkout
    pub use crate::checkout::{
        CheckoutEngine, CheckoutOutcome, CheckoutRequest, Customer, FsReceiptStore,
        MemoryReceiptStore, Order, OrderItem, OrderStatus, OrderSummary, Receipt, ReceiptStore,
    };

    // Pricing
    pub use crate::metal::{
        FixedPrices, MetalPriceFeed, MetalPricesView, MetalRates, SpotPriceConfig, SpotPriceFeed,
    };

    // Events
    pub use crate::events::{ChangeEvent, EventBus};

    // Search
    pub use crate::search::{ItemQuery, SortOption};

    // Storage
    pub use crate::storage::{MemoryStore, Store};
    #[cfg(feature = "postgres")]
    pub use crate::storage::PgStore;
}

//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use karat_cache::Session;
use karat_commerce::prelude::*;
use karat_db::{Db, DbOptions};

use crate::config::{ServerConfig, StorageBackend};

/// Everything a handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub checkout: CheckoutEngine,
    pub prices: Arc<dyn MetalPriceFeed>,
    pub carts: Session<Cart>,
    pub admin_token: Option<Arc<str>>,
}

fn new_cart(id: &karat_cache::SessionId) -> Cart {
    Cart::new(id.as_str())
}

impl AppState {
    pub fn new(
        catalog: CatalogService,
        prices: Arc<dyn MetalPriceFeed>,
        receipts: Arc<dyn ReceiptStore>,
    ) -> Self {
        let checkout = CheckoutEngine::new(catalog.clone(), prices.clone(), receipts);
        Self {
            catalog,
            checkout,
            prices,
            carts: Session::new().with_init(new_cart),
            admin_token: None,
        }
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token.map(Arc::from);
        self
    }

    /// Drop carts left untouched for longer than `timeout`.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.carts = self.carts.with_idle_timeout(timeout);
        self
    }

    /// Build the state described by `config`, connecting to storage.
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        let currency = config.pricing.currency()?;

        let store: Arc<dyn Store> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Postgres => {
                let url = config
                    .storage
                    .database_url
                    .as_deref()
                    .context("storage.database_url is required for the postgres backend")?;
                let options = DbOptions::new(url).with_max_connections(config.storage.max_connections);
                let db = Db::connect(&options)
                    .await
                    .context("Failed to connect to Postgres")?;
                Arc::new(PgStore::new(db))
            }
        };

        let prices = Arc::new(SpotPriceFeed::new(config.pricing.spot_price_config()?));
        let receipts = Arc::new(FsReceiptStore::new(config.receipts.directory.clone()));
        let events = EventBus::new(config.server.event_capacity);
        let catalog = CatalogService::new(store, events).with_currency(currency);

        Ok(Self::new(catalog, prices, receipts)
            .with_admin_token(config.server.admin_token.clone())
            .with_session_timeout(config.sessions.idle_timeout()))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        self.catalog.store()
    }

    pub fn events(&self) -> &EventBus {
        self.catalog.events()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// State over in-memory storage with fixed 6000/70 rates.
    pub fn memory_state() -> AppState {
        AppState::new(
            CatalogService::new(Arc::new(MemoryStore::new()), EventBus::default()),
            Arc::new(FixedPrices::per_gram(6000.0, 70.0, Currency::INR)),
            Arc::new(MemoryReceiptStore::new()),
        )
    }
}

//! Metal spot prices.
//!
//! The live feed quotes USD per troy ounce; checkout needs local currency per
//! gram. Any failure along the way (network, status, body shape, a missing
//! or non-positive rate) is logged and replaced by the configured fallback,
//! so callers always get rates.

use crate::catalog::Metal;
use crate::error::CommerceError;
use crate::money::{Currency, Money};
use async_trait::async_trait;
use karat_data::FetchClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Grams in one troy ounce.
pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1035;

/// Where a set of rates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Live,
    Fallback,
}

/// Per-gram rates for the priced metals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetalRates {
    pub gold: Money,
    pub silver: Money,
    pub source: RateSource,
}

impl MetalRates {
    pub fn new(gold: Money, silver: Money, source: RateSource) -> Self {
        Self {
            gold,
            silver,
            source,
        }
    }

    /// The hardcoded rates used when no feed is reachable: 5000 gold, 70 silver.
    pub fn default_fallback(currency: Currency) -> Self {
        Self::new(
            Money::from_decimal(5000.0, currency),
            Money::from_decimal(70.0, currency),
            RateSource::Fallback,
        )
    }

    pub fn rate(&self, metal: Metal) -> Money {
        match metal {
            Metal::Gold => self.gold,
            Metal::Silver => self.silver,
        }
    }

    /// Client-facing shape: `{"Gold": 5000.0, "Silver": 70.0}`.
    pub fn to_view(&self) -> MetalPricesView {
        MetalPricesView {
            gold: self.gold.to_decimal(),
            silver: self.silver.to_decimal(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetalPricesView {
    #[serde(rename = "Gold")]
    pub gold: f64,
    #[serde(rename = "Silver")]
    pub silver: f64,
}

/// Source of per-gram metal rates. Never fails.
#[async_trait]
pub trait MetalPriceFeed: Send + Sync {
    async fn metal_prices(&self) -> MetalRates;
}

/// A feed that always returns the same rates.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrices(pub MetalRates);

impl FixedPrices {
    /// Fixed rates given as decimal amounts per gram.
    pub fn per_gram(gold: f64, silver: f64, currency: Currency) -> Self {
        Self(MetalRates::new(
            Money::from_decimal(gold, currency),
            Money::from_decimal(silver, currency),
            RateSource::Live,
        ))
    }
}

#[async_trait]
impl MetalPriceFeed for FixedPrices {
    async fn metal_prices(&self) -> MetalRates {
        self.0
    }
}

/// Settings for [`SpotPriceFeed`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpotPriceConfig {
    /// Endpoint returning `{"rates": {"USDXAU": .., "USDXAG": ..}}`.
    pub api_url: String,
    /// API key; without one the feed serves the fallback.
    pub api_key: Option<String>,
    /// Local currency units per USD.
    pub usd_to_local: f64,
    pub currency: Currency,
    pub fallback_gold: f64,
    pub fallback_silver: f64,
    pub timeout: Duration,
}

impl Default for SpotPriceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.metalpriceapi.com/v1/latest".to_string(),
            api_key: None,
            usd_to_local: 82.0,
            currency: Currency::INR,
            fallback_gold: 5000.0,
            fallback_silver: 70.0,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Live feed backed by a metal price HTTP API.
#[derive(Debug, Clone)]
pub struct SpotPriceFeed {
    client: FetchClient,
    config: SpotPriceConfig,
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    rates: Option<HashMap<String, serde_json::Value>>,
}

impl SpotPriceFeed {
    pub fn new(config: SpotPriceConfig) -> Self {
        let client = FetchClient::new()
            .with_default_header("Accept", "application/json")
            .with_timeout(config.timeout);
        Self { client, config }
    }

    pub fn with_client(mut self, client: FetchClient) -> Self {
        self.client = client;
        self
    }

    pub fn fallback(&self) -> MetalRates {
        MetalRates::new(
            Money::from_decimal(self.config.fallback_gold, self.config.currency),
            Money::from_decimal(self.config.fallback_silver, self.config.currency),
            RateSource::Fallback,
        )
    }

    /// Fetch and convert live rates, surfacing any failure.
    pub async fn fetch_live(&self) -> Result<MetalRates, CommerceError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CommerceError::UpstreamError("no price API key configured".into()))?;

        let body = self
            .client
            .get(&self.config.api_url)
            .query("api_key", api_key)
            .query("base", "USD")
            .query("currencies", "XAU,XAG")
            .send()
            .await?
            .error_for_status()?
            .text()?;

        self.convert(&body)
    }

    /// Convert a quote body to per-gram local rates.
    pub fn convert(&self, body: &str) -> Result<MetalRates, CommerceError> {
        let quote: QuoteBody = serde_json::from_str(body)
            .map_err(|e| CommerceError::UpstreamError(format!("malformed quote: {e}")))?;
        let rates = quote
            .rates
            .ok_or_else(|| CommerceError::UpstreamError("quote is missing rates".into()))?;

        let gold = per_gram(&rates, "USDXAU", self.config.usd_to_local, self.config.currency)?;
        let silver = per_gram(&rates, "USDXAG", self.config.usd_to_local, self.config.currency)?;
        Ok(MetalRates::new(gold, silver, RateSource::Live))
    }
}

fn per_gram(
    rates: &HashMap<String, serde_json::Value>,
    key: &str,
    usd_to_local: f64,
    currency: Currency,
) -> Result<Money, CommerceError> {
    let usd_per_ounce = rates
        .get(key)
        .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| CommerceError::UpstreamError(format!("quote is missing {key}")))?;

    // Money::from_decimal rounds to 2 places.
    Ok(Money::from_decimal(
        usd_per_ounce * usd_to_local / GRAMS_PER_TROY_OUNCE,
        currency,
    ))
}

#[async_trait]
impl MetalPriceFeed for SpotPriceFeed {
    async fn metal_prices(&self) -> MetalRates {
        match self.fetch_live().await {
            Ok(rates) => rates,
            Err(e) => {
                tracing::warn!(error = %e, "metal price feed unavailable, using fallback rates");
                self.fallback()
            }
        }
    }
}

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::market_data_model::Observation;
use super::market_data_traits::MarketDataProviderTrait;
use crate::assets::AssetClass;
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LookupKey {
    Price(String, Option<NaiveDate>),
    Fx(String, Option<NaiveDate>),
    PriceOnOrBefore(String, NaiveDate, u32),
    FxOnOrBefore(String, NaiveDate, u32),
}

#[derive(Debug, Clone, Copy)]
enum Cached {
    Value(Option<Decimal>),
    Observed(Option<Observation>),
}

/// Memoizes successful lookups per `(symbol, date)`, unavailable results
/// included. Errors are never cached.
///
/// Spot lookups (`date = None`) are cached too, so an instance should live
/// for one valuation or one replay, not for the life of the process.
pub struct CachedMarketData {
    inner: Arc<dyn MarketDataProviderTrait>,
    cache: DashMap<LookupKey, Cached>,
}

impl CachedMarketData {
    pub fn new(inner: Arc<dyn MarketDataProviderTrait>) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    fn cached_value(&self, key: &LookupKey) -> Option<Option<Decimal>> {
        match self.cache.get(key).map(|entry| *entry.value()) {
            Some(Cached::Value(v)) => Some(v),
            _ => None,
        }
    }

    fn cached_observation(&self, key: &LookupKey) -> Option<Option<Observation>> {
        match self.cache.get(key).map(|entry| *entry.value()) {
            Some(Cached::Observed(o)) => Some(o),
            _ => None,
        }
    }
}

#[async_trait]
impl MarketDataProviderTrait for CachedMarketData {
    async fn price_lookup(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        date: Option<NaiveDate>,
    ) -> Result<Option<Decimal>> {
        let key = LookupKey::Price(symbol.to_string(), date);
        if let Some(hit) = self.cached_value(&key) {
            return Ok(hit);
        }
        let value = self.inner.price_lookup(symbol, asset_class, date).await?;
        self.cache.insert(key, Cached::Value(value));
        Ok(value)
    }

    async fn fx_lookup(&self, pair: &str, date: Option<NaiveDate>) -> Result<Option<Decimal>> {
        let key = LookupKey::Fx(pair.to_string(), date);
        if let Some(hit) = self.cached_value(&key) {
            return Ok(hit);
        }
        let value = self.inner.fx_lookup(pair, date).await?;
        self.cache.insert(key, Cached::Value(value));
        Ok(value)
    }

    async fn price_on_or_before(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Option<Observation>> {
        let key = LookupKey::PriceOnOrBefore(symbol.to_string(), date, lookback_days);
        if let Some(hit) = self.cached_observation(&key) {
            return Ok(hit);
        }
        let observed = self
            .inner
            .price_on_or_before(symbol, asset_class, date, lookback_days)
            .await?;
        self.cache.insert(key, Cached::Observed(observed));
        Ok(observed)
    }

    async fn fx_on_or_before(
        &self,
        pair: &str,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Option<Observation>> {
        let key = LookupKey::FxOnOrBefore(pair.to_string(), date, lookback_days);
        if let Some(hit) = self.cached_observation(&key) {
            return Ok(hit);
        }
        let observed = self.inner.fx_on_or_before(pair, date, lookback_days).await?;
        self.cache.insert(key, Cached::Observed(observed));
        Ok(observed)
    }
}

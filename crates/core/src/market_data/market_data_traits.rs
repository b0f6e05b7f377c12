use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::market_data_model::{Observation, Quote};
use crate::assets::AssetClass;
use crate::errors::Result;
use crate::utils::time_utils::lookback_dates;

/// Price and FX capability consumed by valuation.
///
/// `Ok(None)` means unavailable; callers fall back rather than fail.
/// `date = None` asks for the latest (spot) value.
#[async_trait]
pub trait MarketDataProviderTrait: Send + Sync {
    async fn price_lookup(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        date: Option<NaiveDate>,
    ) -> Result<Option<Decimal>>;

    async fn fx_lookup(&self, pair: &str, date: Option<NaiveDate>) -> Result<Option<Decimal>>;

    /// Newest price on `date` or up to `lookback_days` calendar days before it.
    async fn price_on_or_before(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Option<Observation>> {
        for day in lookback_dates(date, lookback_days) {
            if let Some(value) = self.price_lookup(symbol, asset_class, Some(day)).await? {
                return Ok(Some(Observation { date: day, value }));
            }
        }
        Ok(None)
    }

    /// Newest rate on `date` or up to `lookback_days` calendar days before it.
    async fn fx_on_or_before(
        &self,
        pair: &str,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Option<Observation>> {
        for day in lookback_dates(date, lookback_days) {
            if let Some(value) = self.fx_lookup(pair, Some(day)).await? {
                return Ok(Some(Observation { date: day, value }));
            }
        }
        Ok(None)
    }
}

/// Storage of daily quotes; FX pairs are stored as symbols (e.g. `USDTWD`).
#[async_trait]
pub trait QuoteRepositoryTrait: Send + Sync {
    async fn save_quotes(&self, quotes: Vec<Quote>) -> Result<usize>;

    fn get_quote(&self, symbol: &str, date: NaiveDate) -> Result<Option<Quote>>;

    /// Newest quote dated on or before `date` and not before `not_before`.
    fn latest_on_or_before(
        &self,
        symbol: &str,
        date: NaiveDate,
        not_before: NaiveDate,
    ) -> Result<Option<Quote>>;

    /// Newest quote of the symbol.
    fn latest(&self, symbol: &str) -> Result<Option<Quote>>;

    fn list(&self, symbol: &str) -> Result<Vec<Quote>>;

    async fn delete_quote(&self, symbol: &str, date: NaiveDate) -> Result<usize>;
}

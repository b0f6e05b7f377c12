use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::market_data_model::Observation;
use super::market_data_traits::{MarketDataProviderTrait, QuoteRepositoryTrait};
use crate::assets::AssetClass;
use crate::errors::Result;

/// Serves lookups from stored quotes.
///
/// Futures are priced off the quote of their root symbol; the contract
/// qualifier separates positions, not quotes.
pub struct QuoteProvider {
    repository: Arc<dyn QuoteRepositoryTrait>,
}

impl QuoteProvider {
    pub fn new(repository: Arc<dyn QuoteRepositoryTrait>) -> Self {
        Self { repository }
    }

    fn lookup(&self, symbol: &str, date: Option<NaiveDate>) -> Result<Option<Decimal>> {
        let quote = match date {
            Some(day) => self.repository.get_quote(symbol, day)?,
            None => self.repository.latest(symbol)?,
        };
        Ok(quote.map(|q| q.close))
    }

    fn lookback(&self, symbol: &str, date: NaiveDate, lookback_days: u32) -> Result<Option<Observation>> {
        let not_before = date
            .checked_sub_signed(Duration::days(i64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        Ok(self
            .repository
            .latest_on_or_before(symbol, date, not_before)?
            .map(|q| Observation {
                date: q.date,
                value: q.close,
            }))
    }
}

#[async_trait]
impl MarketDataProviderTrait for QuoteProvider {
    async fn price_lookup(
        &self,
        symbol: &str,
        _asset_class: AssetClass,
        date: Option<NaiveDate>,
    ) -> Result<Option<Decimal>> {
        self.lookup(symbol, date)
    }

    async fn fx_lookup(&self, pair: &str, date: Option<NaiveDate>) -> Result<Option<Decimal>> {
        self.lookup(pair, date)
    }

    async fn price_on_or_before(
        &self,
        symbol: &str,
        _asset_class: AssetClass,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Option<Observation>> {
        self.lookback(symbol, date, lookback_days)
    }

    async fn fx_on_or_before(
        &self,
        pair: &str,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Option<Observation>> {
        self.lookback(pair, date, lookback_days)
    }
}

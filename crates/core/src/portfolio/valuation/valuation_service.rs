use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::valuation_calculator::{aggregate_valuations, value_position};
use super::valuation_model::{FxQuote, FxSource, PortfolioValuation, PriceSource};
use crate::constants::USD_TWD_PAIR;
use crate::errors::Result;
use crate::market_data::MarketDataProviderTrait;
use crate::portfolio::positions::{Position, PositionRepositoryTrait};
use crate::settings::EngineSettings;

/// Which quotes a valuation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuationMode {
    /// Latest available quote and rate.
    Spot,
    /// Quote of the valuation date, looking back a bounded number of days.
    Historical,
}

#[async_trait]
pub trait ValuationServiceTrait: Send + Sync {
    /// Values the stored positions at spot prices and labels the result `as_of`.
    async fn current_valuation(&self, as_of: NaiveDate) -> Result<PortfolioValuation>;

    /// Values an arbitrary set of positions on `date`.
    async fn value_positions(
        &self,
        positions: &[Position],
        date: NaiveDate,
        mode: ValuationMode,
    ) -> Result<PortfolioValuation>;

    /// USD->TWD rate for `date`, with its provenance.
    async fn usd_twd(&self, date: NaiveDate, mode: ValuationMode) -> FxQuote;
}

pub struct ValuationService {
    position_repository: Arc<dyn PositionRepositoryTrait>,
    market_data: Arc<dyn MarketDataProviderTrait>,
    settings: EngineSettings,
}

impl ValuationService {
    pub fn new(
        position_repository: Arc<dyn PositionRepositoryTrait>,
        market_data: Arc<dyn MarketDataProviderTrait>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            position_repository,
            market_data,
            settings,
        }
    }

    async fn spot_fx(&self) -> Option<Decimal> {
        match self.market_data.fx_lookup(USD_TWD_PAIR, None).await {
            Ok(rate) => rate.filter(|r| *r > Decimal::ZERO),
            Err(e) => {
                warn!("Spot {} lookup failed: {}", USD_TWD_PAIR, e);
                None
            }
        }
    }

    async fn resolve_price(
        &self,
        position: &Position,
        date: NaiveDate,
        mode: ValuationMode,
    ) -> (Decimal, PriceSource) {
        if position.asset_class.is_cash() {
            return (Decimal::ONE, PriceSource::Unit);
        }

        let found = match mode {
            ValuationMode::Spot => self
                .market_data
                .price_lookup(&position.symbol, position.asset_class, None)
                .await
                .map(|price| price.map(|p| (p, PriceSource::Market))),
            ValuationMode::Historical => self
                .market_data
                .price_on_or_before(
                    &position.symbol,
                    position.asset_class,
                    date,
                    self.settings.lookback_days,
                )
                .await
                .map(|obs| {
                    obs.map(|o| {
                        let source = if o.date == date {
                            PriceSource::Market
                        } else {
                            PriceSource::LookBack { observed_on: o.date }
                        };
                        (o.value, source)
                    })
                }),
        };

        match found {
            Ok(Some(price)) => price,
            Ok(None) => {
                warn!(
                    "No price for {} on {}; valuing at cost basis {}",
                    position.symbol, date, position.average_cost
                );
                (position.average_cost, PriceSource::CostBasis)
            }
            Err(e) => {
                warn!(
                    "Price lookup for {} on {} failed ({}); valuing at cost basis {}",
                    position.symbol, date, e, position.average_cost
                );
                (position.average_cost, PriceSource::CostBasis)
            }
        }
    }
}

#[async_trait]
impl ValuationServiceTrait for ValuationService {
    async fn current_valuation(&self, as_of: NaiveDate) -> Result<PortfolioValuation> {
        let positions = self.position_repository.list()?;
        self.value_positions(&positions, as_of, ValuationMode::Spot).await
    }

    async fn value_positions(
        &self,
        positions: &[Position],
        date: NaiveDate,
        mode: ValuationMode,
    ) -> Result<PortfolioValuation> {
        let fx = self.usd_twd(date, mode).await;
        let prices = join_all(
            positions
                .iter()
                .map(|position| self.resolve_price(position, date, mode)),
        )
        .await;
        let assets = positions
            .iter()
            .zip(prices)
            .map(|(position, (price, source))| value_position(position, price, source, &fx))
            .collect();
        let valuation = aggregate_valuations(date, fx, assets);
        debug!(
            "Valued {} positions on {}: total {} TWD, exposure {} TWD, {} price fallbacks",
            valuation.assets.len(),
            date,
            valuation.total_value_twd,
            valuation.total_exposure_twd,
            valuation.fallback_count()
        );
        Ok(valuation)
    }

    async fn usd_twd(&self, date: NaiveDate, mode: ValuationMode) -> FxQuote {
        if mode == ValuationMode::Historical {
            match self
                .market_data
                .fx_on_or_before(USD_TWD_PAIR, date, self.settings.lookback_days)
                .await
            {
                Ok(Some(obs)) if obs.value > Decimal::ZERO => {
                    let source = if obs.date == date {
                        FxSource::Market
                    } else {
                        FxSource::LookBack {
                            observed_on: obs.date,
                        }
                    };
                    return FxQuote {
                        usd_twd: obs.value,
                        source,
                    };
                }
                Ok(_) => debug!("No {} rate near {}; trying spot", USD_TWD_PAIR, date),
                Err(e) => warn!("{} lookup for {} failed: {}", USD_TWD_PAIR, date, e),
            }
        }

        if let Some(rate) = self.spot_fx().await {
            let source = match mode {
                ValuationMode::Spot => FxSource::Market,
                ValuationMode::Historical => FxSource::Spot,
            };
            return FxQuote {
                usd_twd: rate,
                source,
            };
        }

        warn!(
            "No {} rate available for {}; using configured {}",
            USD_TWD_PAIR, date, self.settings.fallback_usd_twd
        );
        FxQuote {
            usd_twd: self.settings.fallback_usd_twd,
            source: FxSource::Configured,
        }
    }
}

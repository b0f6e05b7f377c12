//! Net worth snapshot model.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::anomalies::Anomaly;
use crate::portfolio::valuation::{AssetValuation, FxSource, PortfolioValuation};
use crate::utils::decimal_utils::round_valuation;

/// Aggregate portfolio value on one calendar date. At most one per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthSnapshot {
    pub date: NaiveDate,
    pub total_value_twd: Decimal,
    pub total_value_usd: Decimal,
    pub total_exposure_twd: Decimal,
    pub leverage_ratio: Decimal,
    pub usd_twd_rate: Decimal,
    pub fx_source: FxSource,
    pub details: Vec<AssetValuation>,
}

impl NetWorthSnapshot {
    /// Freezes a valuation, rounding every money figure to storage precision.
    pub fn from_valuation(valuation: PortfolioValuation) -> Self {
        let details = valuation
            .assets
            .into_iter()
            .map(|mut a| {
                a.value_twd = round_valuation(a.value_twd);
                a.exposure_twd = round_valuation(a.exposure_twd);
                a.equity_twd = round_valuation(a.equity_twd);
                a.unrealized_pnl_twd = round_valuation(a.unrealized_pnl_twd);
                a.pnl_percentage = round_valuation(a.pnl_percentage);
                a.leverage = round_valuation(a.leverage);
                a
            })
            .collect();

        Self {
            date: valuation.date,
            total_value_twd: round_valuation(valuation.total_value_twd),
            total_value_usd: round_valuation(valuation.total_value_usd),
            total_exposure_twd: round_valuation(valuation.total_exposure_twd),
            leverage_ratio: round_valuation(valuation.leverage_ratio),
            usd_twd_rate: valuation.fx.usd_twd,
            fx_source: valuation.fx.source,
            details,
        }
    }

    pub fn fx_fallback(&self) -> bool {
        !matches!(self.fx_source, FxSource::Market)
    }

    pub fn price_fallbacks(&self) -> usize {
        self.details
            .iter()
            .filter(|d| d.price_source.is_fallback())
            .count()
    }
}

/// Outcome of a historical replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub snapshots_written: usize,
    pub events_applied: usize,
    /// Days whose valuation used at least one fallback price.
    pub price_fallback_days: usize,
    pub fx_fallback_days: usize,
    pub anomalies: Vec<Anomaly>,
}

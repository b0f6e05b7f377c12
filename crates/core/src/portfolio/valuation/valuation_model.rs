use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::assets::{AssetClass, Currency};

/// Where a valuation price came from. Anything but `Market` and `Unit` is a
/// fallback and is kept in the snapshot for auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PriceSource {
    /// Quote for the valuation date itself (or spot).
    Market,
    /// Newest quote inside the look-back window.
    LookBack { observed_on: NaiveDate },
    /// No quote; the position's average cost stands in for the price.
    CostBasis,
    /// Cash: one unit is worth one unit of its currency.
    Unit,
}

impl PriceSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, PriceSource::LookBack { .. } | PriceSource::CostBasis)
    }
}

/// Where the USD->TWD rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FxSource {
    Market,
    LookBack { observed_on: NaiveDate },
    /// Spot rate used for a historical date.
    Spot,
    /// Configured constant; no rate was available at all.
    Configured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FxQuote {
    pub usd_twd: Decimal,
    pub source: FxSource,
}

impl FxQuote {
    pub fn is_fallback(&self) -> bool {
        !matches!(self.source, FxSource::Market)
    }

    /// Units of TWD per unit of `currency`.
    pub fn to_twd(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Twd => Decimal::ONE,
            Currency::Usd => self.usd_twd,
        }
    }
}

/// Per-asset breakdown. All `*_twd` figures are in the functional currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetValuation {
    pub position_id: String,
    pub symbol: String,
    pub contract_qualifier: Option<String>,
    pub name: Option<String>,
    pub asset_class: AssetClass,
    pub currency: Currency,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    /// Price in the position's currency (the FX rate for USD cash).
    pub price: Decimal,
    pub price_source: PriceSource,
    pub contract_size: Decimal,
    pub margin: Decimal,
    /// Contribution to net worth.
    pub value_twd: Decimal,
    /// Notional market exposure.
    pub exposure_twd: Decimal,
    /// Liquidation value; equals `value_twd` for every asset class.
    pub equity_twd: Decimal,
    pub unrealized_pnl_twd: Decimal,
    pub pnl_percentage: Decimal,
    /// Stored multiplier for equities, derived notional/margin for futures.
    pub leverage: Decimal,
    /// Futures without posted margin: leverage cannot be derived.
    #[serde(default)]
    pub leverage_undefined: bool,
}

/// Aggregated valuation of every position on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub date: NaiveDate,
    pub fx: FxQuote,
    pub total_value_twd: Decimal,
    /// Value of the USD-denominated holdings, in USD.
    pub total_value_usd: Decimal,
    pub total_exposure_twd: Decimal,
    /// `Σ exposure / Σ value`, zero when the total value is not positive.
    pub leverage_ratio: Decimal,
    pub assets: Vec<AssetValuation>,
}

impl PortfolioValuation {
    pub fn fallback_count(&self) -> usize {
        self.assets
            .iter()
            .filter(|a| a.price_source.is_fallback())
            .count()
    }
}

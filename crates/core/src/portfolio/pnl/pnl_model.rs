use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::assets::{AssetClass, Currency};

/// Realized profit of one sell event.
///
/// Records are regenerated wholesale per symbol, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizedPnLRecord {
    /// `PNL-{transaction_id}`.
    pub id: String,
    pub transaction_id: i64,
    pub date: NaiveDate,
    pub symbol: String,
    pub contract_qualifier: Option<String>,
    pub asset_class: AssetClass,
    pub currency: Currency,
    pub quantity: Decimal,
    pub sell_price: Decimal,
    pub gross_pnl: Decimal,
    pub matched_buy_fees: Decimal,
    pub sell_fee: Decimal,
    pub sell_tax: Decimal,
    /// `gross - sell fee - sell tax - matched buy fees`.
    pub pnl: Decimal,
    pub notes: String,
}

impl RealizedPnLRecord {
    pub fn id_for(transaction_id: i64) -> String {
        format!("PNL-{}", transaction_id)
    }
}

/// Realized PnL of one date with the running total up to it, per currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativePnL {
    pub date: NaiveDate,
    pub currency: Currency,
    pub daily_pnl: Decimal,
    pub cumulative_pnl: Decimal,
}

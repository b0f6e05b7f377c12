//! Data-integrity findings raised while replaying the ledger.
//!
//! Anomalies never stop processing; they are collected and reported next to
//! the best-effort result.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::assets::AssetClass;
use crate::transactions::TradeAction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Anomaly {
    /// A sell asked for more units than the open lots hold. The unmatched
    /// remainder was realized at a zero cost basis.
    OverSell {
        transaction_id: i64,
        date: NaiveDate,
        symbol: String,
        requested: Decimal,
        available: Decimal,
    },
    /// A short-side action. Short positions are not tracked, so the event
    /// only moved cash.
    UnsupportedShort {
        transaction_id: i64,
        date: NaiveDate,
        symbol: String,
        action: TradeAction,
    },
    /// The event's asset class differs from the open position with the same
    /// key. The event was not applied.
    AssetClassMismatch {
        transaction_id: i64,
        symbol: String,
        position_class: AssetClass,
        event_class: AssetClass,
    },
}

impl Anomaly {
    pub fn transaction_id(&self) -> i64 {
        match self {
            Anomaly::OverSell { transaction_id, .. }
            | Anomaly::UnsupportedShort { transaction_id, .. }
            | Anomaly::AssetClassMismatch { transaction_id, .. } => *transaction_id,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Anomaly::OverSell { symbol, .. }
            | Anomaly::UnsupportedShort { symbol, .. }
            | Anomaly::AssetClassMismatch { symbol, .. } => symbol,
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::OverSell {
                transaction_id,
                date,
                symbol,
                requested,
                available,
            } => write!(
                f,
                "over-sell of {} on {} (#{}): sold {}, only {} held",
                symbol, date, transaction_id, requested, available
            ),
            Anomaly::UnsupportedShort {
                transaction_id,
                date,
                symbol,
                action,
            } => write!(
                f,
                "short-side {} of {} on {} (#{}) recorded as cash only",
                action, symbol, date, transaction_id
            ),
            Anomaly::AssetClassMismatch {
                transaction_id,
                symbol,
                position_class,
                event_class,
            } => write!(
                f,
                "{} (#{}) is {} but the open position is {}; skipped",
                symbol, transaction_id, event_class, position_class
            ),
        }
    }
}

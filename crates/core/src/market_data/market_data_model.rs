use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::MarketDataError;
use crate::errors::Result;

/// A daily closing price (or FX rate) for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: Decimal,
    /// Where the value came from, e.g. `MANUAL` or a provider name.
    pub source: String,
}

impl Quote {
    pub fn manual(symbol: impl Into<String>, date: NaiveDate, close: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            close,
            source: "MANUAL".to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(MarketDataError::InvalidQuote("symbol is empty".to_string()).into());
        }
        if self.close <= Decimal::ZERO {
            return Err(MarketDataError::InvalidQuote(format!(
                "{} on {}: close must be positive, got {}",
                self.symbol, self.date, self.close
            ))
            .into());
        }
        Ok(())
    }
}

/// A value together with the date it was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Decimal,
}

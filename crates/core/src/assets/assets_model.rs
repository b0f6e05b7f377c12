//! Asset domain models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, ValidationError};

/// Currency a position is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Twd,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Twd => "TWD",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TWD" | "NTD" => Ok(Currency::Twd),
            "USD" => Ok(Currency::Usd),
            other => Err(ValidationError::InvalidInput(format!("Unsupported currency '{}'", other)).into()),
        }
    }
}

/// Instrument type of a transaction or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetClass {
    CashTwd,
    CashUsd,
    EquityTw,
    EquityUs,
    FutureTw,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::CashTwd,
        AssetClass::CashUsd,
        AssetClass::EquityTw,
        AssetClass::EquityUs,
        AssetClass::FutureTw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::CashTwd => "CASH_TWD",
            AssetClass::CashUsd => "CASH_USD",
            AssetClass::EquityTw => "EQUITY_TW",
            AssetClass::EquityUs => "EQUITY_US",
            AssetClass::FutureTw => "FUTURE_TW",
        }
    }

    pub fn is_cash(&self) -> bool {
        matches!(self, AssetClass::CashTwd | AssetClass::CashUsd)
    }

    pub fn is_future(&self) -> bool {
        matches!(self, AssetClass::FutureTw)
    }

    pub fn currency(&self) -> Currency {
        match self {
            AssetClass::CashUsd | AssetClass::EquityUs => Currency::Usd,
            AssetClass::CashTwd | AssetClass::EquityTw | AssetClass::FutureTw => Currency::Twd,
        }
    }

    /// Cash class holding balances of the given currency.
    pub fn cash_for(currency: Currency) -> AssetClass {
        match currency {
            Currency::Twd => AssetClass::CashTwd,
            Currency::Usd => AssetClass::CashUsd,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = Error;

    /// Accepts the canonical names plus the short codes used by older
    /// ledgers (`TWD`, `USD`, `TW_STOCK`, `US_STOCK`, `TW_FUTURE`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH_TWD" | "TWD" => Ok(AssetClass::CashTwd),
            "CASH_USD" | "USD" => Ok(AssetClass::CashUsd),
            "EQUITY_TW" | "TW_STOCK" => Ok(AssetClass::EquityTw),
            "EQUITY_US" | "US_STOCK" => Ok(AssetClass::EquityUs),
            "FUTURE_TW" | "TW_FUTURE" => Ok(AssetClass::FutureTw),
            other => Err(ValidationError::UnknownAssetClass(other.to_string()).into()),
        }
    }
}

/// User-maintained profile of a symbol.
///
/// Every field is optional; a missing value falls back to what the
/// transactions carry, then to the engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub symbol: String,
    pub name: Option<String>,
    pub leverage: Option<Decimal>,
    pub contract_size: Option<Decimal>,
    pub margin: Option<Decimal>,
    pub currency: Option<Currency>,
}

impl AssetMetadata {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::MissingField("symbol".to_string()).into());
        }
        for (field, value) in [
            ("leverage", self.leverage),
            ("contractSize", self.contract_size),
            ("margin", self.margin),
        ] {
            if matches!(value, Some(v) if v.is_sign_negative()) {
                return Err(ValidationError::InvalidInput(format!(
                    "{} must not be negative for {}",
                    field, self.symbol
                ))
                .into());
            }
        }
        if matches!(self.contract_size, Some(v) if v.is_zero()) {
            return Err(ValidationError::InvalidInput(format!(
                "contractSize must be positive for {}",
                self.symbol
            ))
            .into());
        }
        Ok(())
    }
}

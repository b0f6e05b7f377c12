//! Transaction domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::assets::AssetClass;
use crate::errors::{Error, Result, ValidationError};

/// Trade verb of a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    BuyOpen,
    Sell,
    SellClose,
    SellOpen,
    BuyClose,
    BuyDay,
    SellDay,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::BuyOpen => "BUY_OPEN",
            TradeAction::Sell => "SELL",
            TradeAction::SellClose => "SELL_CLOSE",
            TradeAction::SellOpen => "SELL_OPEN",
            TradeAction::BuyClose => "BUY_CLOSE",
            TradeAction::BuyDay => "BUY_DAY",
            TradeAction::SellDay => "SELL_DAY",
        }
    }

    /// Actions that add a lot to inventory.
    pub fn is_buy_class(&self) -> bool {
        matches!(self, TradeAction::Buy | TradeAction::BuyOpen)
    }

    /// Actions that consume lots from inventory.
    pub fn is_sell_class(&self) -> bool {
        matches!(self, TradeAction::Sell | TradeAction::SellClose)
    }

    pub fn is_day_trade(&self) -> bool {
        matches!(self, TradeAction::BuyDay | TradeAction::SellDay)
    }

    /// Short-side actions; they would open or cover a short position.
    pub fn is_short_side(&self) -> bool {
        matches!(self, TradeAction::SellOpen | TradeAction::BuyClose)
    }

    /// True when cash leaves the account (`-price*qty-fee`).
    pub fn pays_cash(&self) -> bool {
        matches!(
            self,
            TradeAction::Buy | TradeAction::BuyOpen | TradeAction::BuyDay | TradeAction::BuyClose
        )
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeAction {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeAction::Buy),
            "BUY_OPEN" => Ok(TradeAction::BuyOpen),
            "SELL" => Ok(TradeAction::Sell),
            "SELL_CLOSE" => Ok(TradeAction::SellClose),
            "SELL_OPEN" => Ok(TradeAction::SellOpen),
            "BUY_CLOSE" => Ok(TradeAction::BuyClose),
            "BUY_DAY" | "BUY_DT" => Ok(TradeAction::BuyDay),
            "SELL_DAY" | "SELL_DT" => Ok(TradeAction::SellDay),
            other => Err(ValidationError::UnknownAction(other.to_string()).into()),
        }
    }
}

/// A normalized trade produced by an importer or entered by hand, before
/// the ledger has accepted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub asset_class: AssetClass,
    pub symbol: String,
    /// Contract month or similar; distinguishes futures positions.
    pub contract_qualifier: Option<String>,
    /// Display name as printed on the statement.
    pub name: Option<String>,
    pub action: TradeAction,
    pub price: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    /// Margin posted with a futures open.
    #[serde(default)]
    pub assigned_margin: Decimal,
    /// Contract size; `None` means the default of 1.
    pub multiplier: Option<Decimal>,
}

impl NewTransaction {
    /// Minimal constructor; fees, tax and margin start at zero.
    pub fn new(
        date: NaiveDate,
        asset_class: AssetClass,
        symbol: impl Into<String>,
        action: TradeAction,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            date,
            asset_class,
            symbol: symbol.into(),
            contract_qualifier: None,
            name: None,
            action,
            price,
            quantity,
            fee: Decimal::ZERO,
            tax: Decimal::ZERO,
            assigned_margin: Decimal::ZERO,
            multiplier: None,
        }
    }

    pub fn with_costs(mut self, fee: Decimal, tax: Decimal) -> Self {
        self.fee = fee;
        self.tax = tax;
        self
    }

    pub fn with_margin(mut self, assigned_margin: Decimal) -> Self {
        self.assigned_margin = assigned_margin;
        self
    }

    pub fn with_contract(mut self, qualifier: Option<String>, multiplier: Option<Decimal>) -> Self {
        self.contract_qualifier = qualifier;
        self.multiplier = multiplier;
        self
    }

    /// Checks the import-boundary rules: positive quantity, non-negative
    /// amounts, margin only on futures.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::MissingField("symbol".to_string()).into());
        }
        if self.quantity <= Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "quantity must be positive, got {} for {} on {}",
                self.quantity, self.symbol, self.date
            ))
            .into());
        }
        if self.price.is_sign_negative() {
            return Err(ValidationError::InvalidInput(format!(
                "price must not be negative, got {} for {}",
                self.price, self.symbol
            ))
            .into());
        }
        if self.fee.is_sign_negative() || self.tax.is_sign_negative() {
            return Err(ValidationError::InvalidInput(format!(
                "fee and tax must not be negative for {} on {}",
                self.symbol, self.date
            ))
            .into());
        }
        if self.assigned_margin.is_sign_negative() {
            return Err(ValidationError::InvalidInput(format!(
                "assigned margin must not be negative for {}",
                self.symbol
            ))
            .into());
        }
        if !self.assigned_margin.is_zero() && !self.asset_class.is_future() {
            return Err(ValidationError::InvalidInput(format!(
                "assigned margin is only valid for futures, {} is {}",
                self.symbol, self.asset_class
            ))
            .into());
        }
        if let Some(m) = self.multiplier {
            if m <= Decimal::ZERO {
                return Err(ValidationError::InvalidInput(format!(
                    "multiplier must be positive for {}",
                    self.symbol
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// An immutable fact owned by the ledger.
///
/// `id` is the ledger insertion sequence; together with `date` it defines
/// the only valid replay order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    pub id: i64,
    pub date: NaiveDate,
    pub asset_class: AssetClass,
    pub symbol: String,
    pub contract_qualifier: Option<String>,
    pub name: Option<String>,
    pub action: TradeAction,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub tax: Decimal,
    pub assigned_margin: Decimal,
    pub multiplier: Option<Decimal>,
}

impl TransactionEvent {
    pub fn from_new(id: i64, new: NewTransaction) -> Self {
        Self {
            id,
            date: new.date,
            asset_class: new.asset_class,
            symbol: new.symbol,
            contract_qualifier: new.contract_qualifier,
            name: new.name,
            action: new.action,
            price: new.price,
            quantity: new.quantity,
            fee: new.fee,
            tax: new.tax,
            assigned_margin: new.assigned_margin,
            multiplier: new.multiplier,
        }
    }

    /// Replay ordering key.
    pub fn order_key(&self) -> (NaiveDate, i64) {
        (self.date, self.id)
    }

    pub fn gross_amount(&self) -> Decimal {
        self.price * self.quantity
    }
}

/// Result of offering one candidate to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum IngestOutcome {
    Inserted { id: i64 },
    SkippedDuplicate { existing_id: i64 },
}

/// Puts events into replay order.
pub fn sort_for_replay(events: &mut [TransactionEvent]) {
    events.sort_by_key(|e| e.order_key());
}

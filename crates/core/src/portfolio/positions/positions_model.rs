use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::assets::{AssetClass, AssetMetadata, Currency};
use crate::constants::QUANTITY_THRESHOLD;
use crate::transactions::TransactionEvent;

pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    let threshold =
        Decimal::from_str_radix(QUANTITY_THRESHOLD, 10).unwrap_or_else(|_| Decimal::new(1, 8));
    quantity.abs() >= threshold
}

/// Identity of a position: symbol plus optional contract qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionKey {
    pub symbol: String,
    pub contract_qualifier: Option<String>,
}

impl PositionKey {
    pub fn new(symbol: impl Into<String>, contract_qualifier: Option<String>) -> Self {
        Self {
            symbol: symbol.into(),
            contract_qualifier,
        }
    }

    pub fn of(event: &TransactionEvent) -> Self {
        Self::new(event.symbol.clone(), event.contract_qualifier.clone())
    }

    pub fn position_id(&self) -> String {
        match &self.contract_qualifier {
            Some(q) => format!("POS-{}-{}", self.symbol, q),
            None => format!("POS-{}", self.symbol),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub asset_class: AssetClass,
    pub symbol: String,
    pub contract_qualifier: Option<String>,
    pub name: Option<String>,
    pub quantity: Decimal,
    /// Weighted-average unit cost in the position's currency.
    pub average_cost: Decimal,
    /// Exposure multiplier of equities (e.g. 2 for a 2x ETF). Always zero for cash.
    pub leverage_multiplier: Decimal,
    pub contract_size: Decimal,
    /// Margin currently posted for a futures position.
    pub margin_balance: Decimal,
    pub currency: Currency,
    pub opened_on: Option<NaiveDate>,
    #[serde(default)]
    pub lots: VecDeque<Lot>,
}

/// An open slice of a buy, consumed first-in first-out.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub transaction_id: i64,
    pub acquired_on: NaiveDate,
    pub quantity_remaining: Decimal,
    pub unit_price: Decimal,
    /// Buy fee per unit, attributed to whichever sell consumes the unit.
    pub unit_fee: Decimal,
}

impl Position {
    /// Opens an empty position, taking leverage, contract size and currency
    /// from the asset profile first, then from the event, then from the
    /// defaults (leverage 1, contract size 1). Margin starts at zero and is
    /// only ever added by posted buys.
    pub fn open(event: &TransactionEvent, metadata: Option<&AssetMetadata>) -> Self {
        let key = PositionKey::of(event);
        let leverage_multiplier = if event.asset_class.is_cash() {
            Decimal::ZERO
        } else {
            metadata.and_then(|m| m.leverage).unwrap_or(Decimal::ONE)
        };
        let contract_size = metadata
            .and_then(|m| m.contract_size)
            .or(event.multiplier)
            .unwrap_or(Decimal::ONE);
        let currency = metadata
            .and_then(|m| m.currency)
            .unwrap_or_else(|| event.asset_class.currency());
        let name = metadata
            .and_then(|m| m.name.clone())
            .or_else(|| event.name.clone());

        debug!(
            "Opening position {} ({}) leverage={} contract_size={}",
            key.position_id(),
            event.asset_class,
            leverage_multiplier,
            contract_size
        );

        Position {
            id: key.position_id(),
            asset_class: event.asset_class,
            symbol: key.symbol,
            contract_qualifier: key.contract_qualifier,
            name,
            quantity: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            leverage_multiplier,
            contract_size,
            margin_balance: Decimal::ZERO,
            currency,
            opened_on: Some(event.date),
            lots: VecDeque::new(),
        }
    }

    /// A user-maintained cash balance.
    pub fn cash(currency: Currency, balance: Decimal) -> Self {
        let asset_class = AssetClass::cash_for(currency);
        Position {
            id: format!("CASH-{}", currency),
            asset_class,
            symbol: currency.as_str().to_string(),
            contract_qualifier: None,
            name: Some(format!("{} cash", currency)),
            quantity: balance,
            average_cost: Decimal::ONE,
            leverage_multiplier: Decimal::ZERO,
            contract_size: Decimal::ONE,
            margin_balance: Decimal::ZERO,
            currency,
            opened_on: None,
            lots: VecDeque::new(),
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.symbol.clone(), self.contract_qualifier.clone())
    }

    /// Leverage used for exposure; cash never carries market exposure.
    pub fn effective_leverage(&self) -> Decimal {
        if self.asset_class.is_cash() {
            Decimal::ZERO
        } else {
            self.leverage_multiplier
        }
    }

    pub fn lot_quantity(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.quantity_remaining).sum()
    }

    pub fn cost_basis(&self) -> Decimal {
        self.average_cost * self.quantity * self.contract_size_for_cost()
    }

    fn contract_size_for_cost(&self) -> Decimal {
        if self.asset_class.is_future() {
            self.contract_size
        } else {
            Decimal::ONE
        }
    }

    pub fn is_open(&self) -> bool {
        is_quantity_significant(&self.quantity)
    }

    /// Adds a buy: pushes a lot, folds the price into the weighted average
    /// and accumulates `posted_margin`.
    pub fn add_buy(&mut self, event: &TransactionEvent, posted_margin: Decimal) {
        let qty = event.quantity;
        if !qty.is_sign_positive() || qty.is_zero() {
            warn!(
                "Skipping buy #{} for {} with non-positive quantity {}",
                event.id, self.id, qty
            );
            return;
        }

        let new_quantity = self.quantity + qty;
        self.average_cost = (self.average_cost * self.quantity + event.price * qty) / new_quantity;
        self.quantity = new_quantity;
        self.margin_balance += posted_margin;
        if self.opened_on.is_none() {
            self.opened_on = Some(event.date);
        }

        self.lots.push_back(Lot {
            transaction_id: event.id,
            acquired_on: event.date,
            quantity_remaining: qty,
            unit_price: event.price,
            unit_fee: event.fee / qty,
        });
    }

    /// Decrements the quantity after a sell. A result at or below zero
    /// resets quantity, average cost and margin; the negative remainder is
    /// discarded and reported separately as an over-sell.
    pub fn reduce(&mut self, sold: Decimal) {
        self.quantity -= sold;
        if self.quantity.is_sign_negative() || !is_quantity_significant(&self.quantity) {
            if self.quantity.is_sign_negative() {
                warn!(
                    "Position {} went negative ({}); clamped to zero",
                    self.id, self.quantity
                );
            }
            self.quantity = Decimal::ZERO;
            self.average_cost = Decimal::ZERO;
            self.margin_balance = Decimal::ZERO;
            self.lots.clear();
        }
    }
}

//! Signed cash effects of ledger events.
//!
//! Buys pay `price*qty*size + fee`, sells receive `price*qty*size - fee - tax`,
//! each in the currency of the instrument. Futures opens and closes move
//! margin instead of notional; those legs are produced by the position
//! tracker, which knows the released margin and the realized gross.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::assets::{AssetClass, Currency};
use crate::transactions::TransactionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub currency: Currency,
    pub amount: Decimal,
}

impl CashFlow {
    pub fn new(currency: Currency, amount: Decimal) -> Self {
        Self { currency, amount }
    }
}

/// Cash leg of a plain trade, scaled by `contract_size`.
pub fn trade_cash_flow(event: &TransactionEvent, contract_size: Decimal) -> CashFlow {
    let notional = event.price * event.quantity * contract_size;
    let amount = if event.action.pays_cash() {
        -notional - event.fee
    } else {
        notional - event.fee - event.tax
    };
    CashFlow::new(event.asset_class.currency(), amount)
}

/// Cash legs of an event on a cash asset class.
///
/// A CASH_USD buy converts TWD into USD at `price`; a CASH_TWD buy is a
/// deposit of `price*qty` TWD. Sells reverse the direction.
pub fn cash_class_flows(event: &TransactionEvent) -> Vec<CashFlow> {
    let gross = event.price * event.quantity;
    let buying = event.action.pays_cash();
    match event.asset_class {
        AssetClass::CashUsd => {
            if buying {
                vec![
                    CashFlow::new(Currency::Usd, event.quantity),
                    CashFlow::new(Currency::Twd, -gross - event.fee),
                ]
            } else {
                vec![
                    CashFlow::new(Currency::Usd, -event.quantity),
                    CashFlow::new(Currency::Twd, gross - event.fee - event.tax),
                ]
            }
        }
        _ => {
            let amount = if buying {
                gross - event.fee
            } else {
                -gross - event.fee - event.tax
            };
            vec![CashFlow::new(Currency::Twd, amount)]
        }
    }
}

/// Running cash per currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBalances(BTreeMap<Currency, Decimal>);

impl CashBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, currency: Currency) -> Decimal {
        self.0.get(&currency).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn set(&mut self, currency: Currency, amount: Decimal) {
        self.0.insert(currency, amount);
    }

    pub fn apply(&mut self, flow: &CashFlow) {
        *self.0.entry(flow.currency).or_insert(Decimal::ZERO) += flow.amount;
    }

    pub fn apply_all<'a>(&mut self, flows: impl IntoIterator<Item = &'a CashFlow>) {
        for flow in flows {
            self.apply(flow);
        }
    }

    /// `self - other`, per currency.
    pub fn minus(&self, other: &CashBalances) -> CashBalances {
        let mut out = self.clone();
        for (currency, amount) in &other.0 {
            *out.0.entry(*currency).or_insert(Decimal::ZERO) -= *amount;
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (Currency, Decimal)> + '_ {
        self.0.iter().map(|(c, a)| (*c, *a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::{NewTransaction, TradeAction};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn event(class: AssetClass, action: TradeAction, qty: Decimal, price: Decimal) -> TransactionEvent {
        TransactionEvent::from_new(
            1,
            NewTransaction::new(
                NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                class,
                "X",
                action,
                qty,
                price,
            )
            .with_costs(dec!(20), dec!(5)),
        )
    }

    #[test]
    fn buy_pays_notional_and_fee() {
        let e = event(AssetClass::EquityTw, TradeAction::Buy, dec!(1000), dec!(10.5));
        let flow = trade_cash_flow(&e, Decimal::ONE);
        assert_eq!(flow, CashFlow::new(Currency::Twd, dec!(-10520)));
    }

    #[test]
    fn sell_receives_notional_less_fee_and_tax() {
        let e = event(AssetClass::EquityUs, TradeAction::Sell, dec!(10), dec!(100));
        let flow = trade_cash_flow(&e, Decimal::ONE);
        assert_eq!(flow, CashFlow::new(Currency::Usd, dec!(975)));
    }

    #[test]
    fn usd_purchase_moves_both_currencies() {
        let e = event(AssetClass::CashUsd, TradeAction::Buy, dec!(1000), dec!(32));
        let flows = cash_class_flows(&e);
        assert_eq!(
            flows,
            vec![
                CashFlow::new(Currency::Usd, dec!(1000)),
                CashFlow::new(Currency::Twd, dec!(-32020)),
            ]
        );
    }

    #[test]
    fn balances_subtract_per_currency() {
        let mut current = CashBalances::new();
        current.set(Currency::Twd, dec!(100));
        let mut flows = CashBalances::new();
        flows.apply(&CashFlow::new(Currency::Twd, dec!(-40)));
        flows.apply(&CashFlow::new(Currency::Usd, dec!(10)));

        let opening = current.minus(&flows);
        assert_eq!(opening.get(Currency::Twd), dec!(140));
        assert_eq!(opening.get(Currency::Usd), dec!(-10));
    }
}

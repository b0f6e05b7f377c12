//! Replays ledger events into positions, lots and realized PnL.
//!
//! Events must arrive in `(date, id)` order. The tracker refuses anything
//! else, because FIFO matching depends on it.

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use super::positions_model::{is_quantity_significant, Position, PositionKey};
use crate::assets::AssetMetadata;
use crate::errors::{CalculatorError, Result};
use crate::portfolio::anomalies::Anomaly;
use crate::portfolio::cash_flow::{cash_class_flows, trade_cash_flow, CashBalances, CashFlow};
use crate::portfolio::pnl::{match_fifo, RealizedPnLRecord};
use crate::transactions::{sort_for_replay, TransactionEvent};

/// Everything a single `apply` produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyEffect {
    pub realized: Option<RealizedPnLRecord>,
    pub cash_flows: Vec<CashFlow>,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Default)]
pub struct PositionTracker {
    positions: BTreeMap<PositionKey, Position>,
    metadata: HashMap<String, AssetMetadata>,
    last_applied: Option<(NaiveDate, i64)>,
}

impl PositionTracker {
    pub fn new(metadata: HashMap<String, AssetMetadata>) -> Self {
        Self {
            positions: BTreeMap::new(),
            metadata,
            last_applied: None,
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn position(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    /// Open positions, cloned, in key order.
    pub fn snapshot(&self) -> Vec<Position> {
        self.positions.values().cloned().collect()
    }

    pub fn into_positions(self) -> Vec<Position> {
        self.positions.into_values().collect()
    }

    pub fn apply(&mut self, event: &TransactionEvent) -> Result<ApplyEffect> {
        self.check_order(event)?;
        self.last_applied = Some(event.order_key());

        if event.asset_class.is_cash() {
            return Ok(ApplyEffect {
                cash_flows: cash_class_flows(event),
                ..Default::default()
            });
        }

        let contract_size = self.contract_size_for(event);

        if event.action.is_short_side() {
            warn!(
                "Short-side {} #{} for {} recorded as cash only",
                event.action, event.id, event.symbol
            );
            return Ok(ApplyEffect {
                cash_flows: vec![trade_cash_flow(event, contract_size)],
                anomalies: vec![Anomaly::UnsupportedShort {
                    transaction_id: event.id,
                    date: event.date,
                    symbol: event.symbol.clone(),
                    action: event.action,
                }],
                ..Default::default()
            });
        }

        if event.action.is_day_trade() {
            return Ok(ApplyEffect {
                cash_flows: vec![trade_cash_flow(event, contract_size)],
                ..Default::default()
            });
        }

        let key = PositionKey::of(event);
        if let Some(existing) = self.positions.get(&key) {
            if existing.asset_class != event.asset_class {
                warn!(
                    "Skipping #{}: {} is {} but position {} is {}",
                    event.id, event.symbol, event.asset_class, existing.id, existing.asset_class
                );
                return Ok(ApplyEffect {
                    anomalies: vec![Anomaly::AssetClassMismatch {
                        transaction_id: event.id,
                        symbol: event.symbol.clone(),
                        position_class: existing.asset_class,
                        event_class: event.asset_class,
                    }],
                    ..Default::default()
                });
            }
        }

        if event.action.is_buy_class() {
            Ok(self.apply_buy(key, event))
        } else if event.action.is_sell_class() {
            Ok(self.apply_sell(key, event, contract_size))
        } else {
            Err(CalculatorError::InvalidTransaction(format!(
                "unhandled action {} on #{}",
                event.action, event.id
            ))
            .into())
        }
    }

    fn check_order(&self, event: &TransactionEvent) -> Result<()> {
        if let Some((last_date, last_id)) = self.last_applied {
            if event.order_key() <= (last_date, last_id) {
                return Err(CalculatorError::OutOfOrder {
                    transaction_id: event.id,
                    date: event.date,
                    last_id,
                    last_date,
                }
                .into());
            }
        }
        Ok(())
    }

    fn contract_size_for(&self, event: &TransactionEvent) -> Decimal {
        if !event.asset_class.is_future() {
            return Decimal::ONE;
        }
        if let Some(position) = self.positions.get(&PositionKey::of(event)) {
            return position.contract_size;
        }
        self.metadata
            .get(&event.symbol)
            .and_then(|m| m.contract_size)
            .or(event.multiplier)
            .unwrap_or(Decimal::ONE)
    }

    fn apply_buy(&mut self, key: PositionKey, event: &TransactionEvent) -> ApplyEffect {
        let metadata = self.metadata.get(&event.symbol);
        let opening = !self.positions.contains_key(&key);
        let posted_margin = posted_margin(event, metadata, opening);
        let position = self
            .positions
            .entry(key)
            .or_insert_with(|| Position::open(event, metadata));
        position.add_buy(event, posted_margin);

        let flow = if event.asset_class.is_future() {
            CashFlow::new(position.currency, -posted_margin - event.fee)
        } else {
            CashFlow::new(position.currency, -event.gross_amount() - event.fee)
        };

        debug!(
            "#{} {} {} x {} -> qty {} avg {}",
            event.id, event.action, event.symbol, event.quantity, position.quantity, position.average_cost
        );

        ApplyEffect {
            cash_flows: vec![flow],
            ..Default::default()
        }
    }

    fn apply_sell(
        &mut self,
        key: PositionKey,
        event: &TransactionEvent,
        contract_size: Decimal,
    ) -> ApplyEffect {
        let mut anomalies = Vec::new();
        let is_future = event.asset_class.is_future();

        let (held, average_cost, margin_before, currency, fifo) = match self.positions.get_mut(&key) {
            Some(position) => {
                let held = position.quantity;
                let average_cost = position.average_cost;
                let margin_before = position.margin_balance;
                let fifo = match_fifo(&mut position.lots, event.quantity, event.price);
                (held, average_cost, margin_before, position.currency, fifo)
            }
            None => {
                let mut empty = Default::default();
                let fifo = match_fifo(&mut empty, event.quantity, event.price);
                (
                    Decimal::ZERO,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    event.asset_class.currency(),
                    fifo,
                )
            }
        };

        if fifo.is_over_sell() {
            warn!(
                "Over-sell of {} on {} (#{}): sold {}, held {}",
                event.symbol, event.date, event.id, event.quantity, held
            );
            anomalies.push(Anomaly::OverSell {
                transaction_id: event.id,
                date: event.date,
                symbol: event.symbol.clone(),
                requested: event.quantity,
                available: held,
            });
        }

        let (gross, released_margin, method) = if is_future {
            let gross = ((event.price - average_cost) * fifo.matched_quantity
                + event.price * fifo.unmatched_quantity)
                * contract_size;
            let released = if fifo.matched_quantity >= held || held.is_zero() {
                margin_before
            } else {
                margin_before * fifo.matched_quantity / held
            };
            (gross, released, "Weighted average")
        } else {
            (fifo.gross_pnl, Decimal::ZERO, "FIFO")
        };

        let pnl = gross - event.fee - event.tax - fifo.matched_buy_fees;

        let mut notes = format!(
            "{} gross: {}, matched buy fees: {}, sell fee: {}, sell tax: {}",
            method, gross, fifo.matched_buy_fees, event.fee, event.tax
        );
        if is_future {
            notes.push_str(&format!(", margin released: {}", released_margin));
        }
        if fifo.is_over_sell() {
            notes.push_str(&format!(
                ", over-sell: {} units at zero cost basis",
                fifo.unmatched_quantity
            ));
        }

        if let Some(position) = self.positions.get_mut(&key) {
            position.margin_balance -= released_margin;
            position.reduce(event.quantity);
            if !is_quantity_significant(&position.quantity) {
                debug!("Position {} closed by #{}", position.id, event.id);
                self.positions.remove(&key);
            }
        }

        let cash = if is_future {
            CashFlow::new(currency, released_margin + gross - event.fee - event.tax)
        } else {
            CashFlow::new(currency, event.gross_amount() - event.fee - event.tax)
        };

        ApplyEffect {
            realized: Some(RealizedPnLRecord {
                id: RealizedPnLRecord::id_for(event.id),
                transaction_id: event.id,
                date: event.date,
                symbol: event.symbol.clone(),
                contract_qualifier: event.contract_qualifier.clone(),
                asset_class: event.asset_class,
                currency,
                quantity: event.quantity,
                sell_price: event.price,
                gross_pnl: gross,
                matched_buy_fees: fifo.matched_buy_fees,
                sell_fee: event.fee,
                sell_tax: event.tax,
                pnl,
                notes,
            }),
            cash_flows: vec![cash],
            anomalies,
        }
    }
}

/// Margin a buy moves out of cash: the event's own margin, or the profile
/// margin when a futures position opens without one.
fn posted_margin(event: &TransactionEvent, metadata: Option<&AssetMetadata>, opening: bool) -> Decimal {
    if !event.asset_class.is_future() {
        return Decimal::ZERO;
    }
    if event.assigned_margin > Decimal::ZERO || !opening {
        return event.assigned_margin;
    }
    metadata.and_then(|m| m.margin).unwrap_or(Decimal::ZERO)
}

/// Result of replaying a whole ledger.
#[derive(Debug, Clone, Default)]
pub struct LedgerReplay {
    pub positions: Vec<Position>,
    pub realized: Vec<RealizedPnLRecord>,
    pub anomalies: Vec<Anomaly>,
    /// Sum of every cash flow the ledger produced.
    pub net_cash_flows: CashBalances,
}

/// Replays `events` from scratch in `(date, id)` order.
pub fn replay_ledger(
    events: &[TransactionEvent],
    metadata: HashMap<String, AssetMetadata>,
) -> Result<LedgerReplay> {
    let mut ordered = events.to_vec();
    sort_for_replay(&mut ordered);

    let mut tracker = PositionTracker::new(metadata);
    let mut replay = LedgerReplay::default();

    for event in &ordered {
        let effect = tracker.apply(event)?;
        replay.net_cash_flows.apply_all(&effect.cash_flows);
        replay.anomalies.extend(effect.anomalies);
        if let Some(record) = effect.realized {
            replay.realized.push(record);
        }
    }

    replay.positions = tracker.into_positions();
    Ok(replay)
}

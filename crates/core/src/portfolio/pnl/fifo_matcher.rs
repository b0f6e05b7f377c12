//! First-in first-out lot matching.

use rust_decimal::Decimal;
use std::collections::VecDeque;

use crate::portfolio::positions::{is_quantity_significant, Lot};

/// Outcome of matching one sell against a lot queue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FifoMatch {
    pub matched_quantity: Decimal,
    /// Units for which no lot was left; realized at a zero cost basis.
    pub unmatched_quantity: Decimal,
    /// `Σ (sell_price - unit_price) * matched + sell_price * unmatched`.
    pub gross_pnl: Decimal,
    /// `Σ unit_fee * matched`.
    pub matched_buy_fees: Decimal,
    /// `Σ unit_price * matched`.
    pub matched_cost: Decimal,
    /// Ids of the lots touched, oldest first.
    pub consumed_lots: Vec<i64>,
}

impl FifoMatch {
    pub fn is_over_sell(&self) -> bool {
        is_quantity_significant(&self.unmatched_quantity)
    }
}

/// Consumes `sell_quantity` units from the front of `lots`.
///
/// Fully consumed lots are removed; a partially consumed lot stays at the
/// front with its remaining quantity.
pub fn match_fifo(lots: &mut VecDeque<Lot>, sell_quantity: Decimal, sell_price: Decimal) -> FifoMatch {
    let mut result = FifoMatch::default();
    let mut remaining = sell_quantity;

    while remaining > Decimal::ZERO {
        let Some(lot) = lots.front_mut() else {
            result.unmatched_quantity = remaining;
            result.gross_pnl += sell_price * remaining;
            break;
        };

        let matched = lot.quantity_remaining.min(remaining);
        result.gross_pnl += (sell_price - lot.unit_price) * matched;
        result.matched_buy_fees += lot.unit_fee * matched;
        result.matched_cost += lot.unit_price * matched;
        result.matched_quantity += matched;
        result.consumed_lots.push(lot.transaction_id);

        lot.quantity_remaining -= matched;
        remaining -= matched;

        if !is_quantity_significant(&lot.quantity_remaining) {
            lots.pop_front();
        }
    }

    result
}

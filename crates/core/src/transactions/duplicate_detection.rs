//! Duplicate detection for ledger ingestion.
//!
//! Broker statements carry no stable trade identifier, so a candidate is
//! compared field by field against what the ledger already holds. The
//! default rule is an approximate key: two genuinely distinct trades with
//! the same date, symbol, action, quantity, price and asset class cannot be
//! told apart and collapse into one.

use log::debug;

use super::transactions_model::{IngestOutcome, NewTransaction, TransactionEvent};

/// Decides whether a candidate is already represented by an existing event.
pub trait DuplicatePredicate: Send + Sync {
    fn is_duplicate(&self, candidate: &NewTransaction, existing: &TransactionEvent) -> bool;
}

/// Matches on `(date, symbol, action, quantity, price, asset_class)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMatchDuplicate;

impl DuplicatePredicate for FieldMatchDuplicate {
    fn is_duplicate(&self, candidate: &NewTransaction, existing: &TransactionEvent) -> bool {
        candidate.date == existing.date
            && candidate.symbol == existing.symbol
            && candidate.action == existing.action
            && candidate.quantity == existing.quantity
            && candidate.price == existing.price
            && candidate.asset_class == existing.asset_class
    }
}

/// Stricter rule that also requires fee, tax and contract qualifier to match.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictDuplicate;

impl DuplicatePredicate for StrictDuplicate {
    fn is_duplicate(&self, candidate: &NewTransaction, existing: &TransactionEvent) -> bool {
        FieldMatchDuplicate.is_duplicate(candidate, existing)
            && candidate.fee == existing.fee
            && candidate.tax == existing.tax
            && candidate.contract_qualifier == existing.contract_qualifier
    }
}

/// The events a batch would add, with one outcome per candidate in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    pub accepted: Vec<TransactionEvent>,
    pub outcomes: Vec<IngestOutcome>,
}

impl BatchPlan {
    pub fn inserted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.accepted.len()
    }
}

/// Assigns ledger ids starting at `next_id` to every candidate that is not a
/// duplicate of an existing event or of an earlier candidate in the same batch.
pub fn plan_batch(
    existing: &[TransactionEvent],
    candidates: Vec<NewTransaction>,
    next_id: i64,
    predicate: &dyn DuplicatePredicate,
) -> BatchPlan {
    let mut plan = BatchPlan::default();
    let mut id = next_id;

    for candidate in candidates {
        let hit = existing
            .iter()
            .chain(plan.accepted.iter())
            .find(|e| predicate.is_duplicate(&candidate, e))
            .map(|e| e.id);

        match hit {
            Some(existing_id) => {
                debug!(
                    "Skipping duplicate {} {} {} x {} on {} (matches #{})",
                    candidate.action,
                    candidate.symbol,
                    candidate.quantity,
                    candidate.price,
                    candidate.date,
                    existing_id
                );
                plan.outcomes
                    .push(IngestOutcome::SkippedDuplicate { existing_id });
            }
            None => {
                plan.outcomes.push(IngestOutcome::Inserted { id });
                plan.accepted.push(TransactionEvent::from_new(id, candidate));
                id += 1;
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetClass;
    use crate::transactions::TradeAction;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn buy(day: u32, qty: rust_decimal::Decimal) -> NewTransaction {
        NewTransaction::new(
            NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            AssetClass::EquityTw,
            "2330",
            TradeAction::Buy,
            qty,
            dec!(600),
        )
        .with_costs(dec!(20), dec!(0))
    }

    #[test]
    fn test_same_fields_are_duplicates() {
        let existing = vec![TransactionEvent::from_new(1, buy(2, dec!(1000)))];
        let plan = plan_batch(&existing, vec![buy(2, dec!(1000))], 2, &FieldMatchDuplicate);

        assert!(plan.accepted.is_empty());
        assert_eq!(
            plan.outcomes,
            vec![IngestOutcome::SkippedDuplicate { existing_id: 1 }]
        );
    }

    #[test]
    fn test_decimal_scale_does_not_defeat_matching() {
        let existing = vec![TransactionEvent::from_new(1, buy(2, dec!(1000)))];
        let plan = plan_batch(&existing, vec![buy(2, dec!(1000.00))], 2, &FieldMatchDuplicate);
        assert_eq!(plan.skipped_count(), 1);
    }

    #[test]
    fn test_different_quantity_is_inserted_with_next_id() {
        let existing = vec![TransactionEvent::from_new(7, buy(2, dec!(1000)))];
        let plan = plan_batch(&existing, vec![buy(2, dec!(500))], 8, &FieldMatchDuplicate);

        assert_eq!(plan.outcomes, vec![IngestOutcome::Inserted { id: 8 }]);
        assert_eq!(plan.accepted[0].id, 8);
    }

    #[test]
    fn test_fee_difference_is_ignored_by_default_rule() {
        let existing = vec![TransactionEvent::from_new(1, buy(2, dec!(1000)))];
        let other_fee = buy(2, dec!(1000)).with_costs(dec!(25), dec!(0));

        let loose = plan_batch(&existing, vec![other_fee.clone()], 2, &FieldMatchDuplicate);
        assert_eq!(loose.skipped_count(), 1);

        let strict = plan_batch(&existing, vec![other_fee], 2, &StrictDuplicate);
        assert_eq!(strict.inserted_count(), 1);
    }

    /// Two real, identical fills on the same day collapse into one. This is
    /// the accepted limitation of field-matching deduplication.
    #[test]
    fn test_identical_trades_within_one_batch_collapse() {
        let plan = plan_batch(
            &[],
            vec![buy(2, dec!(1000)), buy(2, dec!(1000))],
            1,
            &FieldMatchDuplicate,
        );

        assert_eq!(plan.inserted_count(), 1);
        assert_eq!(
            plan.outcomes,
            vec![
                IngestOutcome::Inserted { id: 1 },
                IngestOutcome::SkippedDuplicate { existing_id: 1 },
            ]
        );
    }
}

//! Day-by-day reconstruction of net worth from the full ledger.
//!
//! Intermediate daily states are never persisted, so the whole series is
//! regenerated: the history table is cleared, the ledger replayed from its
//! first date, and one snapshot written per calendar day.

use chrono::NaiveDate;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::net_worth_model::{NetWorthSnapshot, ReplayReport};
use super::net_worth_traits::SnapshotRepositoryTrait;
use crate::assets::{AssetMetadataRepositoryTrait, Currency};
use crate::errors::{Error, Result};
use crate::portfolio::cash_flow::CashBalances;
use crate::portfolio::positions::{
    replay_ledger, Position, PositionRepositoryTrait, PositionTracker,
};
use crate::portfolio::valuation::{ValuationMode, ValuationServiceTrait};
use crate::transactions::{sort_for_replay, TransactionRepositoryTrait};
use crate::utils::time_utils::get_days_between;

pub struct HistoricalReplayEngine {
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    metadata_repository: Arc<dyn AssetMetadataRepositoryTrait>,
    position_repository: Arc<dyn PositionRepositoryTrait>,
    snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
    valuation_service: Arc<dyn ValuationServiceTrait>,
}

impl HistoricalReplayEngine {
    pub fn new(
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        metadata_repository: Arc<dyn AssetMetadataRepositoryTrait>,
        position_repository: Arc<dyn PositionRepositoryTrait>,
        snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
        valuation_service: Arc<dyn ValuationServiceTrait>,
    ) -> Self {
        Self {
            transaction_repository,
            metadata_repository,
            position_repository,
            snapshot_repository,
            valuation_service,
        }
    }

    fn current_cash(&self) -> Result<CashBalances> {
        let mut balances = CashBalances::new();
        for position in self.position_repository.list_cash()? {
            balances.set(position.currency, position.quantity);
        }
        Ok(balances)
    }

    /// Regenerates one snapshot per day from the first ledger date through
    /// `end`.
    ///
    /// `cancel` is checked before every day and again right before that
    /// day's write; a cancelled run returns `Error::Cancelled` and leaves the
    /// days already written in place.
    pub async fn replay(&self, end: NaiveDate, cancel: &AtomicBool) -> Result<ReplayReport> {
        if cancel.load(Ordering::SeqCst) {
            return Err(Error::Cancelled("replay cancelled before start".to_string()));
        }

        let mut events = self.transaction_repository.list_all()?;
        sort_for_replay(&mut events);
        let metadata = self.metadata_repository.load_map()?;

        // Walk the current cash back to before the first event so that the
        // forward replay lands on today's balance. Every fallible read runs
        // before the stored history is cleared.
        let opening = match events.first() {
            Some(event) => {
                let current_cash = self.current_cash()?;
                let net_flows = replay_ledger(&events, metadata.clone())?.net_cash_flows;
                Some((event.date, current_cash.minus(&net_flows)))
            }
            None => None,
        };

        let mut report = ReplayReport::default();
        let cleared = self.snapshot_repository.delete_all().await?;
        debug!("Cleared {} stored snapshots before replay", cleared);

        let Some((first, mut running_cash)) = opening else {
            info!("Ledger is empty; nothing to replay");
            return Ok(report);
        };
        debug!("Opening cash before {}: {:?}", first, running_cash);

        let days = get_days_between(first, end);
        if days.is_empty() {
            warn!("First transaction {} is after replay end {}", first, end);
            return Ok(report);
        }

        let mut tracker = PositionTracker::new(metadata);
        let mut next = 0;

        for day in days {
            if cancel.load(Ordering::SeqCst) {
                return Err(self.cancelled(&report, day));
            }

            while next < events.len() && events[next].date <= day {
                let effect = tracker.apply(&events[next])?;
                running_cash.apply_all(&effect.cash_flows);
                report.anomalies.extend(effect.anomalies);
                report.events_applied += 1;
                next += 1;
            }

            let mut positions = tracker.snapshot();
            positions.extend(cash_positions(&running_cash));

            let valuation = self
                .valuation_service
                .value_positions(&positions, day, ValuationMode::Historical)
                .await?;
            let snapshot = NetWorthSnapshot::from_valuation(valuation);

            if cancel.load(Ordering::SeqCst) {
                return Err(self.cancelled(&report, day));
            }

            if snapshot.price_fallbacks() > 0 {
                report.price_fallback_days += 1;
            }
            if snapshot.fx_fallback() {
                report.fx_fallback_days += 1;
            }
            debug!(
                "{}: {} positions, net worth {} TWD",
                day,
                snapshot.details.len(),
                snapshot.total_value_twd
            );

            self.snapshot_repository.upsert_snapshot(snapshot).await?;
            report.first_date.get_or_insert(day);
            report.last_date = Some(day);
            report.snapshots_written += 1;
        }

        info!(
            "Replayed {} events into {} snapshots ({} to {}), {} anomalies",
            report.events_applied,
            report.snapshots_written,
            first,
            end,
            report.anomalies.len()
        );
        Ok(report)
    }

    fn cancelled(&self, report: &ReplayReport, day: NaiveDate) -> Error {
        warn!(
            "Replay cancelled at {} after {} snapshots",
            day, report.snapshots_written
        );
        Error::Cancelled(format!(
            "replay stopped at {} after {} snapshots",
            day, report.snapshots_written
        ))
    }
}

/// Running cash as cash positions, skipping currencies with nothing in them.
fn cash_positions(balances: &CashBalances) -> Vec<Position> {
    [Currency::Twd, Currency::Usd]
        .into_iter()
        .map(|c| (c, balances.get(c)))
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(c, amount)| Position::cash(c, amount))
        .collect()
}

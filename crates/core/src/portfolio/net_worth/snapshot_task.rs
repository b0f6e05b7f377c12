use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use std::sync::Arc;

use super::net_worth_model::NetWorthSnapshot;
use super::net_worth_traits::SnapshotRepositoryTrait;
use crate::errors::Result;
use crate::portfolio::valuation::ValuationServiceTrait;
use crate::settings::EngineSettings;
use crate::utils::time_utils::{next_run_after, valuation_date_from_utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Writes today's snapshot from the stored positions at spot prices.
///
/// Running it twice on the same day overwrites the first result.
pub struct DailySnapshotTask {
    snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
    valuation_service: Arc<dyn ValuationServiceTrait>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl DailySnapshotTask {
    pub fn new(
        snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
        valuation_service: Arc<dyn ValuationServiceTrait>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            snapshot_repository,
            valuation_service,
            clock,
            settings,
        }
    }

    pub fn today(&self) -> NaiveDate {
        valuation_date_from_utc(self.clock.now(), self.settings.timezone)
    }

    /// Next instant the task is due, strictly after now.
    pub fn next_run(&self) -> DateTime<Utc> {
        next_run_after(
            self.clock.now(),
            self.settings.snapshot_time,
            self.settings.timezone,
        )
    }

    pub async fn run_once(&self) -> Result<NetWorthSnapshot> {
        let today = self.today();
        let valuation = self.valuation_service.current_valuation(today).await?;
        let snapshot = NetWorthSnapshot::from_valuation(valuation);
        self.snapshot_repository
            .upsert_snapshot(snapshot.clone())
            .await?;
        info!(
            "Recorded net worth for {}: {} TWD (exposure {} TWD, leverage {})",
            snapshot.date, snapshot.total_value_twd, snapshot.total_exposure_twd, snapshot.leverage_ratio
        );
        Ok(snapshot)
    }
}

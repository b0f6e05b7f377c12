//! Net worth snapshots: the daily record, its history, the historical
//! replay that regenerates it and the task that writes today's entry.

mod net_worth_model;
mod net_worth_service;
mod net_worth_traits;
mod replay_engine;
mod snapshot_task;

pub use net_worth_model::*;
pub use net_worth_service::NetWorthService;
pub use net_worth_traits::{NetWorthServiceTrait, SnapshotRepositoryTrait};
pub use replay_engine::HistoricalReplayEngine;
pub use snapshot_task::{Clock, DailySnapshotTask, SystemClock};

#[cfg(test)]
mod replay_engine_tests;

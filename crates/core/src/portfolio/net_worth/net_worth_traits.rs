use async_trait::async_trait;
use chrono::NaiveDate;

use super::net_worth_model::NetWorthSnapshot;
use crate::errors::Result;

/// Persistence of net worth snapshots, keyed by date.
#[async_trait]
pub trait SnapshotRepositoryTrait: Send + Sync {
    /// Inserts the snapshot or overwrites the one already stored for its date.
    async fn upsert_snapshot(&self, snapshot: NetWorthSnapshot) -> Result<()>;

    /// Removes every snapshot; returns how many were deleted.
    async fn delete_all(&self) -> Result<usize>;

    fn get(&self, date: NaiveDate) -> Result<Option<NetWorthSnapshot>>;

    /// Snapshots in `[start, end]`, oldest first.
    fn list_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NetWorthSnapshot>>;

    /// Newest first, skipping `skip` and returning at most `limit`.
    fn list_recent(&self, skip: i64, limit: i64) -> Result<Vec<NetWorthSnapshot>>;
}

/// Read side of the net worth history.
pub trait NetWorthServiceTrait: Send + Sync {
    fn get_snapshot(&self, date: NaiveDate) -> Result<Option<NetWorthSnapshot>>;

    fn get_history(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NetWorthSnapshot>>;

    fn get_recent(&self, skip: i64, limit: i64) -> Result<Vec<NetWorthSnapshot>>;
}

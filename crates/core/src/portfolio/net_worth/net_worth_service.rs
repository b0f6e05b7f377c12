use chrono::NaiveDate;
use std::sync::Arc;

use super::net_worth_model::NetWorthSnapshot;
use super::net_worth_traits::{NetWorthServiceTrait, SnapshotRepositoryTrait};
use crate::errors::{Result, ValidationError};

/// Upper bound on one page of history.
const MAX_PAGE_SIZE: i64 = 1000;

pub struct NetWorthService {
    snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
}

impl NetWorthService {
    pub fn new(snapshot_repository: Arc<dyn SnapshotRepositoryTrait>) -> Self {
        Self {
            snapshot_repository,
        }
    }
}

impl NetWorthServiceTrait for NetWorthService {
    fn get_snapshot(&self, date: NaiveDate) -> Result<Option<NetWorthSnapshot>> {
        self.snapshot_repository.get(date)
    }

    fn get_history(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NetWorthSnapshot>> {
        if start > end {
            return Err(ValidationError::InvalidInput(format!(
                "start date {} is after end date {}",
                start, end
            ))
            .into());
        }
        self.snapshot_repository.list_range(start, end)
    }

    fn get_recent(&self, skip: i64, limit: i64) -> Result<Vec<NetWorthSnapshot>> {
        if skip < 0 || limit <= 0 {
            return Err(ValidationError::InvalidInput(format!(
                "invalid page skip={} limit={}",
                skip, limit
            ))
            .into());
        }
        self.snapshot_repository
            .list_recent(skip, limit.min(MAX_PAGE_SIZE))
    }
}

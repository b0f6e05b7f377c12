use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use super::model::NetWorthSnapshotDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::net_worth_snapshots;
use crate::utils::format_date;
use networth_core::errors::Result;
use networth_core::net_worth::{NetWorthSnapshot, SnapshotRepositoryTrait};

pub struct NetWorthSnapshotRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl NetWorthSnapshotRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        NetWorthSnapshotRepository { pool, writer }
    }

    fn into_snapshots(rows: Vec<NetWorthSnapshotDB>) -> Result<Vec<NetWorthSnapshot>> {
        Ok(rows
            .into_iter()
            .map(NetWorthSnapshot::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl SnapshotRepositoryTrait for NetWorthSnapshotRepository {
    async fn upsert_snapshot(&self, snapshot: NetWorthSnapshot) -> Result<()> {
        let row = NetWorthSnapshotDB::try_from(snapshot)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::replace_into(net_worth_snapshots::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn delete_all(&self) -> Result<usize> {
        let deleted = self
            .writer
            .exec(|conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(net_worth_snapshots::table)
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await?;
        debug!("Deleted {} net worth snapshots", deleted);
        Ok(deleted)
    }

    fn get(&self, date: NaiveDate) -> Result<Option<NetWorthSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        let row = net_worth_snapshots::table
            .find(format_date(date))
            .select(NetWorthSnapshotDB::as_select())
            .first::<NetWorthSnapshotDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(NetWorthSnapshot::try_from).transpose()?)
    }

    fn list_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NetWorthSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = net_worth_snapshots::table
            .filter(net_worth_snapshots::date.ge(format_date(start)))
            .filter(net_worth_snapshots::date.le(format_date(end)))
            .order(net_worth_snapshots::date.asc())
            .select(NetWorthSnapshotDB::as_select())
            .load::<NetWorthSnapshotDB>(&mut conn)
            .map_err(StorageError::from)?;
        Self::into_snapshots(rows)
    }

    fn list_recent(&self, skip: i64, limit: i64) -> Result<Vec<NetWorthSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = net_worth_snapshots::table
            .order(net_worth_snapshots::date.desc())
            .offset(skip)
            .limit(limit)
            .select(NetWorthSnapshotDB::as_select())
            .load::<NetWorthSnapshotDB>(&mut conn)
            .map_err(StorageError::from)?;
        Self::into_snapshots(rows)
    }
}

//! Database model for net worth snapshots.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::utils::{format_date, now_rfc3339, parse_date, parse_decimal};
use networth_core::net_worth::NetWorthSnapshot;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::net_worth_snapshots)]
#[diesel(primary_key(date))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct NetWorthSnapshotDB {
    pub date: String,
    pub total_value_twd: String,
    pub total_value_usd: String,
    pub total_exposure_twd: String,
    pub leverage_ratio: String,
    pub usd_twd_rate: String,
    /// Rate provenance as JSON.
    pub fx_source: String,
    /// Per-asset valuations as JSON.
    pub details: String,
    pub created_at: String,
}

impl TryFrom<NetWorthSnapshotDB> for NetWorthSnapshot {
    type Error = StorageError;

    fn try_from(db: NetWorthSnapshotDB) -> Result<Self, Self::Error> {
        Ok(Self {
            date: parse_date(&db.date, "date")?,
            total_value_twd: parse_decimal(&db.total_value_twd, "total_value_twd")?,
            total_value_usd: parse_decimal(&db.total_value_usd, "total_value_usd")?,
            total_exposure_twd: parse_decimal(&db.total_exposure_twd, "total_exposure_twd")?,
            leverage_ratio: parse_decimal(&db.leverage_ratio, "leverage_ratio")?,
            usd_twd_rate: parse_decimal(&db.usd_twd_rate, "usd_twd_rate")?,
            fx_source: serde_json::from_str(&db.fx_source)?,
            details: serde_json::from_str(&db.details)?,
        })
    }
}

impl TryFrom<NetWorthSnapshot> for NetWorthSnapshotDB {
    type Error = StorageError;

    fn try_from(snapshot: NetWorthSnapshot) -> Result<Self, Self::Error> {
        Ok(Self {
            date: format_date(snapshot.date),
            total_value_twd: snapshot.total_value_twd.to_string(),
            total_value_usd: snapshot.total_value_usd.to_string(),
            total_exposure_twd: snapshot.total_exposure_twd.to_string(),
            leverage_ratio: snapshot.leverage_ratio.to_string(),
            usd_twd_rate: snapshot.usd_twd_rate.to_string(),
            fx_source: serde_json::to_string(&snapshot.fx_source)?,
            details: serde_json::to_string(&snapshot.details)?,
            created_at: now_rfc3339(),
        })
    }
}

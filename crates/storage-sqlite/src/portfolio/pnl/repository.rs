use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use std::sync::Arc;

use super::model::RealizedPnLDB;
use crate::db::get_connection;
use crate::errors::StorageError;
use crate::schema::realized_pnl;
use crate::utils::format_date;
use networth_core::errors::Result;
use networth_core::pnl::{RealizedPnLRecord, RealizedPnLRepositoryTrait};

/// Read side of realized PnL; writes happen inside the ledger commit.
pub struct RealizedPnLRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
}

impl RealizedPnLRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        RealizedPnLRepository { pool }
    }
}

impl RealizedPnLRepositoryTrait for RealizedPnLRepository {
    fn list(
        &self,
        symbol: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<RealizedPnLRecord>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = realized_pnl::table.into_boxed();
        if let Some(symbol) = symbol {
            query = query.filter(realized_pnl::symbol.eq(symbol.to_string()));
        }
        if let Some(start) = start_date {
            query = query.filter(realized_pnl::date.ge(format_date(start)));
        }
        if let Some(end) = end_date {
            query = query.filter(realized_pnl::date.le(format_date(end)));
        }
        let rows = query
            .order((realized_pnl::date.asc(), realized_pnl::transaction_id.asc()))
            .select(RealizedPnLDB::as_select())
            .load::<RealizedPnLDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows
            .into_iter()
            .map(RealizedPnLRecord::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

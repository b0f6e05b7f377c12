use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use super::model::TransactionDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::portfolio::pnl::RealizedPnLDB;
use crate::portfolio::positions::PositionDB;
use crate::schema::{positions, realized_pnl, transactions};
use crate::utils::chunk_for_sqlite;
use networth_core::errors::Result;
use networth_core::transactions::{LedgerCommit, TransactionEvent, TransactionRepositoryTrait};
use networth_core::AssetClass;

pub struct TransactionRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl TransactionRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        TransactionRepository { pool, writer }
    }
}

/// Applies a ledger commit on an open transaction.
fn apply_commit(conn: &mut SqliteConnection, commit: LedgerCommit) -> Result<()> {
    for ids in chunk_for_sqlite(&commit.deletes) {
        diesel::delete(transactions::table.filter(transactions::id.eq_any(ids)))
            .execute(conn)
            .map_err(StorageError::from)?;
    }

    let rows: Vec<TransactionDB> = commit
        .updates
        .into_iter()
        .chain(commit.inserts)
        .map(TransactionDB::from)
        .collect();
    for chunk in chunk_for_sqlite(&rows) {
        diesel::replace_into(transactions::table)
            .values(chunk)
            .execute(conn)
            .map_err(StorageError::from)?;
    }

    let cash_classes = vec![AssetClass::CashTwd.as_str(), AssetClass::CashUsd.as_str()];
    diesel::delete(positions::table.filter(positions::asset_class.ne_all(cash_classes)))
        .execute(conn)
        .map_err(StorageError::from)?;
    let position_rows = commit
        .positions
        .into_iter()
        .filter(|p| !p.asset_class.is_cash())
        .map(PositionDB::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for chunk in chunk_for_sqlite(&position_rows) {
        diesel::insert_into(positions::table)
            .values(chunk)
            .execute(conn)
            .map_err(StorageError::from)?;
    }

    for symbols in chunk_for_sqlite(&commit.pnl_symbols) {
        diesel::delete(realized_pnl::table.filter(realized_pnl::symbol.eq_any(symbols)))
            .execute(conn)
            .map_err(StorageError::from)?;
    }
    let pnl_rows: Vec<RealizedPnLDB> = commit
        .realized_pnl
        .into_iter()
        .map(RealizedPnLDB::from)
        .collect();
    for chunk in chunk_for_sqlite(&pnl_rows) {
        diesel::insert_into(realized_pnl::table)
            .values(chunk)
            .execute(conn)
            .map_err(StorageError::from)?;
    }

    debug!(
        "Committed {} ledger rows, {} deletes, {} positions, {} pnl records",
        rows.len(),
        commit.deletes.len(),
        position_rows.len(),
        pnl_rows.len()
    );
    Ok(())
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    fn list_all(&self) -> Result<Vec<TransactionEvent>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = transactions::table
            .order((transactions::date.asc(), transactions::id.asc()))
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows
            .into_iter()
            .map(TransactionEvent::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn get(&self, id: i64) -> Result<Option<TransactionEvent>> {
        let mut conn = get_connection(&self.pool)?;
        let row = transactions::table
            .find(id)
            .select(TransactionDB::as_select())
            .first::<TransactionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(TransactionEvent::try_from).transpose()?)
    }

    fn max_id(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let max = transactions::table
            .select(diesel::dsl::max(transactions::id))
            .first::<Option<i64>>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(max.unwrap_or(0))
    }

    async fn commit_ledger(&self, commit: LedgerCommit) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| apply_commit(conn, commit))
            .await
    }
}

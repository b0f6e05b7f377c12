use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::model::PositionDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::positions;
use networth_core::errors::Result;
use networth_core::positions::{Position, PositionRepositoryTrait};
use networth_core::Currency;

pub struct PositionRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl PositionRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        PositionRepository { pool, writer }
    }
}

#[async_trait]
impl PositionRepositoryTrait for PositionRepository {
    fn list(&self) -> Result<Vec<Position>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = positions::table
            .order(positions::id.asc())
            .select(PositionDB::as_select())
            .load::<PositionDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows
            .into_iter()
            .map(Position::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn get(&self, position_id: &str) -> Result<Option<Position>> {
        let mut conn = get_connection(&self.pool)?;
        let row = positions::table
            .find(position_id)
            .select(PositionDB::as_select())
            .first::<PositionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(Position::try_from).transpose()?)
    }

    async fn upsert_cash(&self, currency: Currency, balance: Decimal) -> Result<Position> {
        let position = Position::cash(currency, balance);
        let row = PositionDB::try_from(position.clone())?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::replace_into(positions::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        Ok(position)
    }
}

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use super::model::QuoteDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::quotes;
use crate::utils::{chunk_for_sqlite, format_date};
use networth_core::errors::Result;
use networth_core::market_data::{Quote, QuoteRepositoryTrait};

pub struct QuoteRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl QuoteRepository {
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn first_quote(&self, query: quotes::BoxedQuery<'_, diesel::sqlite::Sqlite>) -> Result<Option<Quote>> {
        let mut conn = get_connection(&self.pool)?;
        let row = query
            .select(QuoteDB::as_select())
            .first::<QuoteDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(Quote::try_from).transpose()?)
    }
}

#[async_trait]
impl QuoteRepositoryTrait for QuoteRepository {
    async fn save_quotes(&self, input_quotes: Vec<Quote>) -> Result<usize> {
        if input_quotes.is_empty() {
            return Ok(0);
        }
        let db_rows: Vec<QuoteDB> = input_quotes.iter().map(QuoteDB::from).collect();
        let saved = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut total = 0;
                for chunk in chunk_for_sqlite(&db_rows) {
                    total += diesel::replace_into(quotes::table)
                        .values(chunk)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(total)
            })
            .await?;
        debug!("Saved {} quotes", saved);
        Ok(saved)
    }

    fn get_quote(&self, symbol: &str, date: NaiveDate) -> Result<Option<Quote>> {
        self.first_quote(
            quotes::table
                .filter(quotes::symbol.eq(symbol.to_string()))
                .filter(quotes::date.eq(format_date(date)))
                .into_boxed(),
        )
    }

    fn latest_on_or_before(
        &self,
        symbol: &str,
        date: NaiveDate,
        not_before: NaiveDate,
    ) -> Result<Option<Quote>> {
        self.first_quote(
            quotes::table
                .filter(quotes::symbol.eq(symbol.to_string()))
                .filter(quotes::date.le(format_date(date)))
                .filter(quotes::date.ge(format_date(not_before)))
                .order(quotes::date.desc())
                .into_boxed(),
        )
    }

    fn latest(&self, symbol: &str) -> Result<Option<Quote>> {
        self.first_quote(
            quotes::table
                .filter(quotes::symbol.eq(symbol.to_string()))
                .order(quotes::date.desc())
                .into_boxed(),
        )
    }

    fn list(&self, symbol: &str) -> Result<Vec<Quote>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = quotes::table
            .filter(quotes::symbol.eq(symbol))
            .order(quotes::date.asc())
            .select(QuoteDB::as_select())
            .load::<QuoteDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows
            .into_iter()
            .map(Quote::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    async fn delete_quote(&self, symbol: &str, date: NaiveDate) -> Result<usize> {
        let symbol = symbol.to_string();
        let date = format_date(date);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(quotes::table.find((symbol, date)))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }
}

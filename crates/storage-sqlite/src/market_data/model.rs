//! Database model for stored quotes.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::utils::{format_date, now_rfc3339, parse_date, parse_decimal};
use networth_core::market_data::Quote;

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
#[diesel(table_name = crate::schema::quotes)]
#[diesel(primary_key(symbol, date))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct QuoteDB {
    pub symbol: String,
    pub date: String,
    pub close: String,
    pub source: String,
    pub created_at: String,
}

impl TryFrom<QuoteDB> for Quote {
    type Error = StorageError;

    fn try_from(db: QuoteDB) -> Result<Self, Self::Error> {
        Ok(Self {
            date: parse_date(&db.date, "date")?,
            close: parse_decimal(&db.close, "close")?,
            symbol: db.symbol,
            source: db.source,
        })
    }
}

impl From<&Quote> for QuoteDB {
    fn from(quote: &Quote) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            date: format_date(quote.date),
            close: quote.close.to_string(),
            source: quote.source.clone(),
            created_at: now_rfc3339(),
        }
    }
}

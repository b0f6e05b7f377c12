//! Database model for realized PnL records.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::utils::{format_date, parse_date, parse_decimal, parse_enum};
use networth_core::pnl::RealizedPnLRecord;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::realized_pnl)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct RealizedPnLDB {
    pub id: String,
    pub transaction_id: i64,
    pub date: String,
    pub symbol: String,
    pub contract_qualifier: Option<String>,
    pub asset_class: String,
    pub currency: String,
    pub quantity: String,
    pub sell_price: String,
    pub gross_pnl: String,
    pub matched_buy_fees: String,
    pub sell_fee: String,
    pub sell_tax: String,
    pub pnl: String,
    pub notes: String,
}

impl TryFrom<RealizedPnLDB> for RealizedPnLRecord {
    type Error = StorageError;

    fn try_from(db: RealizedPnLDB) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db.id,
            transaction_id: db.transaction_id,
            date: parse_date(&db.date, "date")?,
            symbol: db.symbol,
            contract_qualifier: db.contract_qualifier,
            asset_class: parse_enum(&db.asset_class, "asset_class")?,
            currency: parse_enum(&db.currency, "currency")?,
            quantity: parse_decimal(&db.quantity, "quantity")?,
            sell_price: parse_decimal(&db.sell_price, "sell_price")?,
            gross_pnl: parse_decimal(&db.gross_pnl, "gross_pnl")?,
            matched_buy_fees: parse_decimal(&db.matched_buy_fees, "matched_buy_fees")?,
            sell_fee: parse_decimal(&db.sell_fee, "sell_fee")?,
            sell_tax: parse_decimal(&db.sell_tax, "sell_tax")?,
            pnl: parse_decimal(&db.pnl, "pnl")?,
            notes: db.notes,
        })
    }
}

impl From<RealizedPnLRecord> for RealizedPnLDB {
    fn from(record: RealizedPnLRecord) -> Self {
        Self {
            id: record.id,
            transaction_id: record.transaction_id,
            date: format_date(record.date),
            symbol: record.symbol,
            contract_qualifier: record.contract_qualifier,
            asset_class: record.asset_class.as_str().to_string(),
            currency: record.currency.as_str().to_string(),
            quantity: record.quantity.to_string(),
            sell_price: record.sell_price.to_string(),
            gross_pnl: record.gross_pnl.to_string(),
            matched_buy_fees: record.matched_buy_fees.to_string(),
            sell_fee: record.sell_fee.to_string(),
            sell_tax: record.sell_tax.to_string(),
            pnl: record.pnl.to_string(),
            notes: record.notes,
        }
    }
}

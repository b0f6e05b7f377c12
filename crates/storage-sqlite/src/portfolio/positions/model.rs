//! Database model for positions.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::utils::{format_date, now_rfc3339, parse_date, parse_decimal, parse_enum};
use networth_core::positions::Position;

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
#[diesel(table_name = crate::schema::positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PositionDB {
    pub id: String,
    pub asset_class: String,
    pub symbol: String,
    pub contract_qualifier: Option<String>,
    pub name: Option<String>,
    pub quantity: String,
    pub average_cost: String,
    pub leverage_multiplier: String,
    pub contract_size: String,
    pub margin_balance: String,
    pub currency: String,
    pub opened_on: Option<String>,
    /// Open lots as JSON, oldest first.
    pub lots: String,
    pub updated_at: String,
}

impl TryFrom<PositionDB> for Position {
    type Error = StorageError;

    fn try_from(db: PositionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db.id,
            asset_class: parse_enum(&db.asset_class, "asset_class")?,
            symbol: db.symbol,
            contract_qualifier: db.contract_qualifier,
            name: db.name,
            quantity: parse_decimal(&db.quantity, "quantity")?,
            average_cost: parse_decimal(&db.average_cost, "average_cost")?,
            leverage_multiplier: parse_decimal(&db.leverage_multiplier, "leverage_multiplier")?,
            contract_size: parse_decimal(&db.contract_size, "contract_size")?,
            margin_balance: parse_decimal(&db.margin_balance, "margin_balance")?,
            currency: parse_enum(&db.currency, "currency")?,
            opened_on: db
                .opened_on
                .as_deref()
                .map(|d| parse_date(d, "opened_on"))
                .transpose()?,
            lots: serde_json::from_str(&db.lots)?,
        })
    }
}

impl TryFrom<Position> for PositionDB {
    type Error = StorageError;

    fn try_from(position: Position) -> Result<Self, Self::Error> {
        Ok(Self {
            lots: serde_json::to_string(&position.lots)?,
            id: position.id,
            asset_class: position.asset_class.as_str().to_string(),
            symbol: position.symbol,
            contract_qualifier: position.contract_qualifier,
            name: position.name,
            quantity: position.quantity.to_string(),
            average_cost: position.average_cost.to_string(),
            leverage_multiplier: position.leverage_multiplier.to_string(),
            contract_size: position.contract_size.to_string(),
            margin_balance: position.margin_balance.to_string(),
            currency: position.currency.as_str().to_string(),
            opened_on: position.opened_on.map(format_date),
            updated_at: now_rfc3339(),
        })
    }
}

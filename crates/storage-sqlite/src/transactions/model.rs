//! Database model for ledger events.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::utils::{format_date, now_rfc3339, parse_date, parse_decimal, parse_enum, parse_optional_decimal};
use networth_core::transactions::TransactionEvent;

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
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct TransactionDB {
    pub id: i64,
    pub date: String,
    pub asset_class: String,
    pub symbol: String,
    pub contract_qualifier: Option<String>,
    pub name: Option<String>,
    pub action: String,
    pub price: String,
    pub quantity: String,
    pub fee: String,
    pub tax: String,
    pub assigned_margin: String,
    pub multiplier: Option<String>,
    pub created_at: String,
}

/// A ledger row that cannot be read back is an error, not a zero: replaying
/// around it would silently change every derived figure.
impl TryFrom<TransactionDB> for TransactionEvent {
    type Error = StorageError;

    fn try_from(db: TransactionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db.id,
            date: parse_date(&db.date, "date")?,
            asset_class: parse_enum(&db.asset_class, "asset_class")?,
            symbol: db.symbol,
            contract_qualifier: db.contract_qualifier,
            name: db.name,
            action: parse_enum(&db.action, "action")?,
            price: parse_decimal(&db.price, "price")?,
            quantity: parse_decimal(&db.quantity, "quantity")?,
            fee: parse_decimal(&db.fee, "fee")?,
            tax: parse_decimal(&db.tax, "tax")?,
            assigned_margin: parse_decimal(&db.assigned_margin, "assigned_margin")?,
            multiplier: parse_optional_decimal(db.multiplier.as_deref(), "multiplier")?,
        })
    }
}

impl From<TransactionEvent> for TransactionDB {
    fn from(event: TransactionEvent) -> Self {
        Self {
            id: event.id,
            date: format_date(event.date),
            asset_class: event.asset_class.as_str().to_string(),
            symbol: event.symbol,
            contract_qualifier: event.contract_qualifier,
            name: event.name,
            action: event.action.as_str().to_string(),
            price: event.price.to_string(),
            quantity: event.quantity.to_string(),
            fee: event.fee.to_string(),
            tax: event.tax.to_string(),
            assigned_margin: event.assigned_margin.to_string(),
            multiplier: event.multiplier.map(|m| m.to_string()),
            created_at: now_rfc3339(),
        }
    }
}

//! Database model for asset profiles.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::utils::{now_rfc3339, parse_enum, parse_optional_decimal};
use networth_core::AssetMetadata;

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
#[diesel(table_name = crate::schema::asset_metadata)]
#[diesel(primary_key(symbol))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadataDB {
    pub symbol: String,
    pub name: Option<String>,
    pub leverage: Option<String>,
    pub contract_size: Option<String>,
    pub margin: Option<String>,
    pub currency: Option<String>,
    pub updated_at: String,
}

impl TryFrom<AssetMetadataDB> for AssetMetadata {
    type Error = StorageError;

    fn try_from(db: AssetMetadataDB) -> Result<Self, Self::Error> {
        Ok(Self {
            symbol: db.symbol,
            name: db.name,
            leverage: parse_optional_decimal(db.leverage.as_deref(), "leverage")?,
            contract_size: parse_optional_decimal(db.contract_size.as_deref(), "contract_size")?,
            margin: parse_optional_decimal(db.margin.as_deref(), "margin")?,
            currency: db
                .currency
                .as_deref()
                .map(|c| parse_enum(c, "currency"))
                .transpose()?,
        })
    }
}

impl From<AssetMetadata> for AssetMetadataDB {
    fn from(metadata: AssetMetadata) -> Self {
        Self {
            symbol: metadata.symbol,
            name: metadata.name,
            leverage: metadata.leverage.map(|d| d.to_string()),
            contract_size: metadata.contract_size.map(|d| d.to_string()),
            margin: metadata.margin.map(|d| d.to_string()),
            currency: metadata.currency.map(|c| c.as_str().to_string()),
            updated_at: now_rfc3339(),
        }
    }
}

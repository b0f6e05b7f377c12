use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use std::sync::Arc;

use super::model::AssetMetadataDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::asset_metadata;
use networth_core::errors::Result;
use networth_core::{AssetMetadata, AssetMetadataRepositoryTrait};

pub struct AssetMetadataRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl AssetMetadataRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        AssetMetadataRepository { pool, writer }
    }
}

#[async_trait]
impl AssetMetadataRepositoryTrait for AssetMetadataRepository {
    fn get(&self, symbol: &str) -> Result<Option<AssetMetadata>> {
        let mut conn = get_connection(&self.pool)?;
        let row = asset_metadata::table
            .find(symbol)
            .select(AssetMetadataDB::as_select())
            .first::<AssetMetadataDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(AssetMetadata::try_from).transpose()?)
    }

    fn list(&self) -> Result<Vec<AssetMetadata>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = asset_metadata::table
            .order(asset_metadata::symbol.asc())
            .select(AssetMetadataDB::as_select())
            .load::<AssetMetadataDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows
            .into_iter()
            .map(AssetMetadata::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    async fn upsert(&self, metadata: AssetMetadata) -> Result<AssetMetadata> {
        let row = AssetMetadataDB::from(metadata.clone());
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::replace_into(asset_metadata::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        Ok(metadata)
    }

    async fn delete(&self, symbol: &str) -> Result<usize> {
        let symbol = symbol.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(asset_metadata::table.find(symbol))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }
}

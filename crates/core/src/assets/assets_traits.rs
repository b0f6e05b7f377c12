use async_trait::async_trait;
use std::collections::HashMap;

use super::assets_model::AssetMetadata;
use crate::errors::Result;

/// Trait defining the contract for asset profile storage.
#[async_trait]
pub trait AssetMetadataRepositoryTrait: Send + Sync {
    fn get(&self, symbol: &str) -> Result<Option<AssetMetadata>>;
    fn list(&self) -> Result<Vec<AssetMetadata>>;
    async fn upsert(&self, metadata: AssetMetadata) -> Result<AssetMetadata>;
    async fn delete(&self, symbol: &str) -> Result<usize>;

    /// All profiles keyed by symbol.
    fn load_map(&self) -> Result<HashMap<String, AssetMetadata>> {
        Ok(self
            .list()?
            .into_iter()
            .map(|m| (m.symbol.clone(), m))
            .collect())
    }
}

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use super::assets_model::AssetMetadata;
use super::assets_traits::AssetMetadataRepositoryTrait;
use crate::errors::Result;
use crate::transactions::LedgerServiceTrait;

/// Service for the `asset_metadata(symbol)` lookup and its maintenance.
///
/// Stored positions copy leverage, contract size and currency from the
/// profile, so every profile write rebuilds the derived state.
#[async_trait]
pub trait AssetServiceTrait: Send + Sync {
    fn asset_metadata(&self, symbol: &str) -> Result<Option<AssetMetadata>>;
    fn list_metadata(&self) -> Result<Vec<AssetMetadata>>;
    async fn save_metadata(&self, metadata: AssetMetadata) -> Result<AssetMetadata>;
    async fn delete_metadata(&self, symbol: &str) -> Result<()>;
}

pub struct AssetService {
    repository: Arc<dyn AssetMetadataRepositoryTrait>,
    ledger_service: Arc<dyn LedgerServiceTrait>,
}

impl AssetService {
    pub fn new(
        repository: Arc<dyn AssetMetadataRepositoryTrait>,
        ledger_service: Arc<dyn LedgerServiceTrait>,
    ) -> Self {
        Self {
            repository,
            ledger_service,
        }
    }
}

#[async_trait]
impl AssetServiceTrait for AssetService {
    fn asset_metadata(&self, symbol: &str) -> Result<Option<AssetMetadata>> {
        self.repository.get(symbol.trim())
    }

    fn list_metadata(&self) -> Result<Vec<AssetMetadata>> {
        self.repository.list()
    }

    async fn save_metadata(&self, mut metadata: AssetMetadata) -> Result<AssetMetadata> {
        metadata.symbol = metadata.symbol.trim().to_string();
        metadata.validate()?;
        debug!("Saving asset profile for {}", metadata.symbol);
        let saved = self.repository.upsert(metadata).await?;
        self.ledger_service.rebuild_derived_state().await?;
        Ok(saved)
    }

    async fn delete_metadata(&self, symbol: &str) -> Result<()> {
        let removed = self.repository.delete(symbol.trim()).await?;
        debug!("Removed {} asset profile(s) for {}", removed, symbol);
        if removed > 0 {
            self.ledger_service.rebuild_derived_state().await?;
        }
        Ok(())
    }
}

use async_trait::async_trait;

use super::positions_model::Position;
use crate::assets::Currency;
use crate::errors::Result;

/// Repository trait for derived and cash positions.
///
/// Non-cash positions are rewritten as a whole by the ledger commit; cash
/// positions are only ever touched through `upsert_cash`.
#[async_trait]
pub trait PositionRepositoryTrait: Send + Sync {
    fn list(&self) -> Result<Vec<Position>>;

    fn list_cash(&self) -> Result<Vec<Position>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|p| p.asset_class.is_cash())
            .collect())
    }

    fn get(&self, position_id: &str) -> Result<Option<Position>>;

    async fn upsert_cash(&self, currency: Currency, balance: rust_decimal::Decimal) -> Result<Position>;
}

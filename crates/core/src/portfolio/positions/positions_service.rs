use async_trait::async_trait;
use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::positions_model::Position;
use super::positions_traits::PositionRepositoryTrait;
use crate::assets::Currency;
use crate::errors::{Result, ValidationError};
use crate::portfolio::cash_flow::CashBalances;

#[async_trait]
pub trait PositionServiceTrait: Send + Sync {
    /// Every stored position, cash included.
    fn get_positions(&self) -> Result<Vec<Position>>;

    /// Current cash balance per currency, as maintained by the user.
    fn get_cash_balances(&self) -> Result<CashBalances>;

    /// Sets a cash balance. Imports never overwrite it.
    async fn set_cash_balance(&self, currency: Currency, balance: Decimal) -> Result<Position>;
}

pub struct PositionService {
    repository: Arc<dyn PositionRepositoryTrait>,
}

impl PositionService {
    pub fn new(repository: Arc<dyn PositionRepositoryTrait>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl PositionServiceTrait for PositionService {
    fn get_positions(&self) -> Result<Vec<Position>> {
        self.repository.list()
    }

    fn get_cash_balances(&self) -> Result<CashBalances> {
        let mut balances = CashBalances::new();
        for position in self.repository.list_cash()? {
            balances.set(position.currency, position.quantity);
        }
        Ok(balances)
    }

    async fn set_cash_balance(&self, currency: Currency, balance: Decimal) -> Result<Position> {
        if balance.is_sign_negative() {
            return Err(ValidationError::InvalidInput(format!(
                "{} cash balance must not be negative, got {}",
                currency, balance
            ))
            .into());
        }
        info!("Setting {} cash balance to {}", currency, balance);
        self.repository.upsert_cash(currency, balance).await
    }
}

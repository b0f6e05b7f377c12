use async_trait::async_trait;

use super::transactions_model::TransactionEvent;
use crate::errors::Result;
use crate::portfolio::pnl::RealizedPnLRecord;
use crate::portfolio::positions::Position;

/// Everything one ledger write changes, committed in a single transaction.
///
/// Derived state travels with the events that produced it: the non-cash
/// positions are replaced wholesale, and the realized PnL of every symbol in
/// `pnl_symbols` is deleted and rewritten from `realized_pnl`.
#[derive(Debug, Clone, Default)]
pub struct LedgerCommit {
    pub inserts: Vec<TransactionEvent>,
    pub updates: Vec<TransactionEvent>,
    pub deletes: Vec<i64>,
    pub positions: Vec<Position>,
    pub pnl_symbols: Vec<String>,
    pub realized_pnl: Vec<RealizedPnLRecord>,
}

impl LedgerCommit {
    pub fn touches_ledger(&self) -> bool {
        !(self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty())
    }
}

/// Storage of the append-only ledger.
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    /// Every event, in replay order.
    fn list_all(&self) -> Result<Vec<TransactionEvent>>;

    fn get(&self, id: i64) -> Result<Option<TransactionEvent>>;

    /// Highest id ever assigned, 0 for an empty ledger.
    fn max_id(&self) -> Result<i64>;

    /// Applies the commit atomically; on error nothing is written.
    async fn commit_ledger(&self, commit: LedgerCommit) -> Result<()>;
}

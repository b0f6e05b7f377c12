use chrono::NaiveDate;

use super::pnl_model::RealizedPnLRecord;
use crate::errors::Result;

/// Read side of realized PnL storage.
///
/// Records are written only by the ledger commit, which replaces every
/// record of the affected symbols at once.
pub trait RealizedPnLRepositoryTrait: Send + Sync {
    /// Records ordered by `(date, transaction_id)`, optionally filtered.
    fn list(
        &self,
        symbol: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<RealizedPnLRecord>>;
}

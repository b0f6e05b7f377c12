//! The transaction ledger: normalized trade events, idempotent ingestion
//! and the single-writer service that keeps derived state in step.

mod duplicate_detection;
mod ledger_service;
mod transactions_model;
mod transactions_traits;

pub use duplicate_detection::*;
pub use ledger_service::{LedgerService, LedgerServiceTrait, LedgerWriteResult};
pub use transactions_model::*;
pub use transactions_traits::{LedgerCommit, TransactionRepositoryTrait};

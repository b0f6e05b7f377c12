//! Single-writer ledger service.
//!
//! Every write replays the full ledger and commits the new events together
//! with the derived positions and realized PnL they produce, so stored state
//! never disagrees with the ledger.

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::duplicate_detection::{plan_batch, DuplicatePredicate, FieldMatchDuplicate};
use super::transactions_model::{IngestOutcome, NewTransaction, TransactionEvent};
use super::transactions_traits::{LedgerCommit, TransactionRepositoryTrait};
use crate::assets::AssetMetadataRepositoryTrait;
use crate::errors::{DatabaseError, Result};
use crate::portfolio::anomalies::Anomaly;
use crate::portfolio::positions::replay_ledger;

/// What a ledger write did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerWriteResult {
    /// One entry per offered candidate, in input order.
    pub outcomes: Vec<IngestOutcome>,
    /// Anomalies on the symbols the write touched.
    pub anomalies: Vec<Anomaly>,
    /// Realized PnL records regenerated.
    pub realized_records: usize,
}

impl LedgerWriteResult {
    pub fn inserted_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, IngestOutcome::Inserted { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.inserted_count()
    }
}

#[async_trait]
pub trait LedgerServiceTrait: Send + Sync {
    fn list_transactions(&self) -> Result<Vec<TransactionEvent>>;

    /// Ingests a batch atomically; duplicates are skipped, not errors.
    async fn ingest_batch(&self, batch: Vec<NewTransaction>) -> Result<LedgerWriteResult>;

    /// Ingests a single hand-entered event.
    async fn record_transaction(&self, transaction: NewTransaction) -> Result<LedgerWriteResult>;

    /// Corrective replacement of an existing event, keeping its id.
    async fn replace_transaction(
        &self,
        id: i64,
        transaction: NewTransaction,
    ) -> Result<LedgerWriteResult>;

    async fn remove_transaction(&self, id: i64) -> Result<LedgerWriteResult>;

    /// Regenerates every position and realized PnL record from the ledger.
    async fn rebuild_derived_state(&self) -> Result<LedgerWriteResult>;
}

pub struct LedgerService {
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    metadata_repository: Arc<dyn AssetMetadataRepositoryTrait>,
    predicate: Arc<dyn DuplicatePredicate>,
    write_lock: Mutex<()>,
}

impl LedgerService {
    pub fn new(
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        metadata_repository: Arc<dyn AssetMetadataRepositoryTrait>,
    ) -> Self {
        Self::with_predicate(
            transaction_repository,
            metadata_repository,
            Arc::new(FieldMatchDuplicate),
        )
    }

    pub fn with_predicate(
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        metadata_repository: Arc<dyn AssetMetadataRepositoryTrait>,
        predicate: Arc<dyn DuplicatePredicate>,
    ) -> Self {
        Self {
            transaction_repository,
            metadata_repository,
            predicate,
            write_lock: Mutex::new(()),
        }
    }

    fn find(&self, ledger: &[TransactionEvent], id: i64) -> Result<usize> {
        ledger
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("transaction #{}", id)).into())
    }

    /// Replays `ledger` and commits `commit` with the derived state of
    /// `symbols`. Must be called with the write lock held.
    async fn commit_with_derived(
        &self,
        ledger: &[TransactionEvent],
        symbols: BTreeSet<String>,
        mut commit: LedgerCommit,
        outcomes: Vec<IngestOutcome>,
    ) -> Result<LedgerWriteResult> {
        let metadata = self.metadata_repository.load_map()?;
        let replay = replay_ledger(ledger, metadata)?;

        let realized: Vec<_> = replay
            .realized
            .into_iter()
            .filter(|r| symbols.contains(&r.symbol))
            .collect();
        let anomalies: Vec<_> = replay
            .anomalies
            .into_iter()
            .filter(|a| symbols.contains(a.symbol()))
            .collect();
        for anomaly in &anomalies {
            warn!("Ledger anomaly: {}", anomaly);
        }

        let realized_records = realized.len();
        commit.positions = replay.positions;
        commit.pnl_symbols = symbols.into_iter().collect();
        commit.realized_pnl = realized;

        debug!(
            "Committing {} inserts, {} updates, {} deletes, {} positions, {} realized records",
            commit.inserts.len(),
            commit.updates.len(),
            commit.deletes.len(),
            commit.positions.len(),
            realized_records
        );
        self.transaction_repository.commit_ledger(commit).await?;

        Ok(LedgerWriteResult {
            outcomes,
            anomalies,
            realized_records,
        })
    }
}

#[async_trait]
impl LedgerServiceTrait for LedgerService {
    fn list_transactions(&self) -> Result<Vec<TransactionEvent>> {
        self.transaction_repository.list_all()
    }

    async fn ingest_batch(&self, batch: Vec<NewTransaction>) -> Result<LedgerWriteResult> {
        for candidate in &batch {
            candidate.validate()?;
        }

        let _guard = self.write_lock.lock().await;
        let mut ledger = self.transaction_repository.list_all()?;
        let next_id = self.transaction_repository.max_id()? + 1;
        let plan = plan_batch(&ledger, batch, next_id, self.predicate.as_ref());

        info!(
            "Ledger batch: {} new, {} duplicates skipped",
            plan.inserted_count(),
            plan.skipped_count()
        );
        if plan.accepted.is_empty() {
            return Ok(LedgerWriteResult {
                outcomes: plan.outcomes,
                ..Default::default()
            });
        }

        let symbols: BTreeSet<String> = plan.accepted.iter().map(|e| e.symbol.clone()).collect();
        ledger.extend(plan.accepted.iter().cloned());
        let commit = LedgerCommit {
            inserts: plan.accepted,
            ..Default::default()
        };
        self.commit_with_derived(&ledger, symbols, commit, plan.outcomes)
            .await
    }

    async fn record_transaction(&self, transaction: NewTransaction) -> Result<LedgerWriteResult> {
        self.ingest_batch(vec![transaction]).await
    }

    async fn replace_transaction(
        &self,
        id: i64,
        transaction: NewTransaction,
    ) -> Result<LedgerWriteResult> {
        transaction.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut ledger = self.transaction_repository.list_all()?;
        let index = self.find(&ledger, id)?;

        let replacement = TransactionEvent::from_new(id, transaction);
        let mut symbols = BTreeSet::new();
        symbols.insert(ledger[index].symbol.clone());
        symbols.insert(replacement.symbol.clone());
        info!("Replacing transaction #{} ({})", id, ledger[index].symbol);
        ledger[index] = replacement.clone();

        let commit = LedgerCommit {
            updates: vec![replacement],
            ..Default::default()
        };
        self.commit_with_derived(&ledger, symbols, commit, Vec::new())
            .await
    }

    async fn remove_transaction(&self, id: i64) -> Result<LedgerWriteResult> {
        let _guard = self.write_lock.lock().await;
        let mut ledger = self.transaction_repository.list_all()?;
        let index = self.find(&ledger, id)?;

        let removed = ledger.remove(index);
        info!("Removing transaction #{} ({})", id, removed.symbol);
        let symbols = BTreeSet::from([removed.symbol]);

        let commit = LedgerCommit {
            deletes: vec![id],
            ..Default::default()
        };
        self.commit_with_derived(&ledger, symbols, commit, Vec::new())
            .await
    }

    async fn rebuild_derived_state(&self) -> Result<LedgerWriteResult> {
        let _guard = self.write_lock.lock().await;
        let ledger = self.transaction_repository.list_all()?;
        let symbols: BTreeSet<String> = ledger.iter().map(|e| e.symbol.clone()).collect();
        info!(
            "Rebuilding derived state from {} transactions over {} symbols",
            ledger.len(),
            symbols.len()
        );
        self.commit_with_derived(&ledger, symbols, LedgerCommit::default(), Vec::new())
            .await
    }
}

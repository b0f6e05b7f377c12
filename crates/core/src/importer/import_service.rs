use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

use super::importer_model::{DateWindow, ImportSummary, StatementFormat};
use super::importer_traits::StatementParser;
use super::tw_broker_parser::TwBrokerParser;
use super::us_broker_parser::UsBrokerParser;
use super::MalformedRow;
use crate::errors::Result;
use crate::transactions::LedgerServiceTrait;

/// Parser for `format`; the window only applies to formats that support it.
pub fn parser_for(format: StatementFormat, window: Option<DateWindow>) -> Box<dyn StatementParser> {
    match format {
        StatementFormat::TwBroker => Box::new(TwBrokerParser::new()),
        StatementFormat::UsBroker => match window {
            Some(w) => Box::new(UsBrokerParser::with_window(w)),
            None => Box::new(UsBrokerParser::new()),
        },
    }
}

#[async_trait]
pub trait ImportServiceTrait: Send + Sync {
    /// Parses a statement and ingests its trades as one atomic batch.
    async fn import_statement(
        &self,
        parser: &dyn StatementParser,
        content: &[u8],
    ) -> Result<ImportSummary>;
}

pub struct ImportService {
    ledger_service: Arc<dyn LedgerServiceTrait>,
}

impl ImportService {
    pub fn new(ledger_service: Arc<dyn LedgerServiceTrait>) -> Self {
        Self { ledger_service }
    }
}

#[async_trait]
impl ImportServiceTrait for ImportService {
    async fn import_statement(
        &self,
        parser: &dyn StatementParser,
        content: &[u8],
    ) -> Result<ImportSummary> {
        let statement = parser.parse(content)?;
        let mut malformed_rows = statement.malformed;

        let mut batch = Vec::with_capacity(statement.events.len());
        for (idx, event) in statement.events.into_iter().enumerate() {
            match event.validate() {
                Ok(()) => batch.push(event),
                Err(e) => {
                    warn!("Rejecting {} {} on {}: {}", event.action, event.symbol, event.date, e);
                    malformed_rows.push(MalformedRow {
                        line: 0,
                        reason: format!("trade {} ({} {}): {}", idx + 1, event.action, event.symbol, e),
                    });
                }
            }
        }
        let parsed = batch.len();

        let result = self.ledger_service.ingest_batch(batch).await?;

        let summary = ImportSummary {
            parsed,
            malformed: malformed_rows.len(),
            ignored: statement.ignored,
            inserted: result.inserted_count(),
            skipped_duplicates: result.skipped_count(),
            malformed_rows,
            anomalies: result.anomalies,
        };
        info!(
            "{} import: {} parsed, {} inserted, {} duplicates, {} malformed, {} anomalies",
            parser.format(),
            summary.parsed,
            summary.inserted,
            summary.skipped_duplicates,
            summary.malformed,
            summary.anomalies.len()
        );
        Ok(summary)
    }
}

use super::importer_model::{ParsedStatement, StatementFormat};
use crate::errors::Result;

/// Turns one broker's statement file into normalized transactions.
///
/// Unparseable rows are reported in `ParsedStatement::malformed`; an `Err`
/// means the file as a whole could not be read.
pub trait StatementParser: Send + Sync {
    fn format(&self) -> StatementFormat;

    fn parse(&self, content: &[u8]) -> Result<ParsedStatement>;
}

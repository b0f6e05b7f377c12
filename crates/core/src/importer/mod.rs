//! Broker statement import: decoding, per-broker parsers and the pipeline
//! that feeds parsed trades into the ledger.

mod import_service;
mod importer_errors;
mod importer_model;
mod importer_traits;
mod statement_reader;
mod tw_broker_parser;
mod us_broker_parser;

pub use import_service::{parser_for, ImportService, ImportServiceTrait};
pub use importer_errors::ImportError;
pub use importer_model::*;
pub use importer_traits::StatementParser;
pub use statement_reader::decode_statement;
pub use tw_broker_parser::TwBrokerParser;
pub use us_broker_parser::UsBrokerParser;

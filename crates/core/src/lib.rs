//! Networth Core - position and valuation accounting engine.
//!
//! Ledger ingestion, lot tracking, realized PnL, valuation and the
//! historical net worth replay. The crate is database-agnostic: storage is
//! reached only through the repository traits, implemented by the
//! `storage-sqlite` crate.

pub mod assets;
pub mod constants;
pub mod errors;
pub mod importer;
pub mod market_data;
pub mod portfolio;
pub mod settings;
pub mod transactions;
pub mod utils;

pub use assets::*;
pub use portfolio::*;

pub use errors::Error;
pub use errors::Result;

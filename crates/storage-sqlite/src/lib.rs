//! SQLite storage implementation for the net worth engine.
//!
//! Implements the repository traits of `networth-core` with Diesel over
//! SQLite:
//! - connection pooling and embedded migrations
//! - a single writer actor; every write is one immediate transaction
//! - repositories for the ledger, positions, realized PnL, asset profiles,
//!   quotes and net worth snapshots
//!
//! Money and quantities are stored as decimal text so that values read back
//! compare equal to the values written.

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod assets;
pub mod market_data;
pub mod portfolio;
pub mod transactions;

pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

pub use errors::{IntoCore, StorageError};

pub use networth_core::errors::{DatabaseError, Error, Result};

#[cfg(test)]
mod repository_tests;

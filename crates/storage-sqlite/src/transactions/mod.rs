//! SQLite storage of the ledger and its atomic commits.

mod model;
mod repository;

pub use model::TransactionDB;
pub use repository::TransactionRepository;

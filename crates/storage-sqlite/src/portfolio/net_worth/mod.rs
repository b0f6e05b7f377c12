//! SQLite storage of the daily net worth history.

mod model;
mod repository;

pub use model::NetWorthSnapshotDB;
pub use repository::NetWorthSnapshotRepository;

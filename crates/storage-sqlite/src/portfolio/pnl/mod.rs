//! SQLite storage of realized PnL records.

mod model;
mod repository;

pub use model::RealizedPnLDB;
pub use repository::RealizedPnLRepository;

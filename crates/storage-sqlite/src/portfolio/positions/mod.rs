//! SQLite storage of derived positions and user cash balances.

mod model;
mod repository;

pub use model::PositionDB;
pub use repository::PositionRepository;

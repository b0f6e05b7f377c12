//! SQLite storage of daily quotes and FX rates.

mod model;
mod repository;

pub use model::QuoteDB;
pub use repository::QuoteRepository;

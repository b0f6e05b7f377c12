//! SQLite storage of user-maintained asset profiles.

mod model;
mod repository;

pub use model::AssetMetadataDB;
pub use repository::AssetMetadataRepository;

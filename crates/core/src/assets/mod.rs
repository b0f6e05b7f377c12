//! Asset classes, currencies and user-maintained asset profiles.

mod assets_model;
mod assets_service;
mod assets_traits;

pub use assets_model::*;
pub use assets_service::{AssetService, AssetServiceTrait};
pub use assets_traits::AssetMetadataRepositoryTrait;

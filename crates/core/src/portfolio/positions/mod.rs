//! Positions, lots and the tracker that derives them from the ledger.

mod position_tracker;
mod positions_model;
mod positions_service;
mod positions_traits;

pub use position_tracker::*;
pub use positions_model::*;
pub use positions_service::{PositionService, PositionServiceTrait};
pub use positions_traits::PositionRepositoryTrait;

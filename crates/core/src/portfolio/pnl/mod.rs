//! Realized PnL: FIFO matching, records and queries.

mod fifo_matcher;
mod pnl_model;
mod pnl_service;
mod pnl_traits;

pub use fifo_matcher::*;
pub use pnl_model::*;
pub use pnl_service::{cumulative_pnl, PnLService, PnLServiceTrait};
pub use pnl_traits::RealizedPnLRepositoryTrait;

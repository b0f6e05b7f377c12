pub mod net_worth;
pub mod pnl;
pub mod positions;

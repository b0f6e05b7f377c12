//! Positions, realized PnL, valuation and net worth.

pub mod anomalies;
pub mod cash_flow;
pub mod net_worth;
pub mod pnl;
pub mod positions;
pub mod valuation;

pub use anomalies::Anomaly;
pub use cash_flow::{CashBalances, CashFlow};

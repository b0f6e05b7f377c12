/// Decimal precision for valuation results written to snapshots
pub const DECIMAL_PRECISION: u32 = 6;

/// Quantity threshold for significant positions
pub const QUANTITY_THRESHOLD: &str = "0.00000001";

/// Quote symbol under which USD->TWD rates are stored and looked up.
pub const USD_TWD_PAIR: &str = "USDTWD";

/// Calendar days searched backwards for a historical price or rate.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::DEFAULT_LOOKBACK_DAYS;

/// Typed engine configuration handed to the core services.
///
/// The core never reads the environment; the binary builds this value from
/// its own configuration layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// Calendar days searched backwards for a missing historical price or rate.
    pub lookback_days: u32,
    /// USD->TWD rate used when no rate can be found at all.
    pub fallback_usd_twd: Decimal,
    /// Zone in which "today" is evaluated.
    pub timezone: Tz,
    /// Local wall-clock time of the daily snapshot.
    pub snapshot_time: NaiveTime,
    pub lookup: LookupSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            fallback_usd_twd: dec!(32.0),
            timezone: chrono_tz::Asia::Taipei,
            snapshot_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default(),
            lookup: LookupSettings::default(),
        }
    }
}

/// Bounds applied to every external price/FX lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupSettings {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay of the exponential backoff between attempts.
    pub base_delay_ms: u64,
    /// Cap of a single backoff delay.
    pub max_delay_ms: u64,
}

impl LookupSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 1_500,
        }
    }
}

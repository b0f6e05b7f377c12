use anyhow::{anyhow, Context};
use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::str::FromStr;

use networth_core::settings::{EngineSettings, LookupSettings};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: String,
    pub log_format: String,
    pub lookback_days: u32,
    pub fallback_usd_twd: Decimal,
    pub snapshot_time: NaiveTime,
    pub timezone: Tz,
    pub lookup_timeout_ms: u64,
    pub lookup_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let snapshot_time = var("NETWORTH_SNAPSHOT_TIME", "14:00");
        let timezone = var("NETWORTH_TIMEZONE", "Asia/Taipei");
        let config = Self {
            db_path: var("NETWORTH_DB_PATH", "./networth.db"),
            log_format: var("NETWORTH_LOG_FORMAT", "text"),
            lookback_days: parse("NETWORTH_LOOKBACK_DAYS", &var("NETWORTH_LOOKBACK_DAYS", "30"))?,
            fallback_usd_twd: parse(
                "NETWORTH_FALLBACK_USD_TWD",
                &var("NETWORTH_FALLBACK_USD_TWD", "32.0"),
            )?,
            snapshot_time: NaiveTime::parse_from_str(&snapshot_time, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(&snapshot_time, "%H:%M:%S"))
                .with_context(|| format!("Invalid NETWORTH_SNAPSHOT_TIME '{}'", snapshot_time))?,
            timezone: timezone
                .parse::<Tz>()
                .map_err(|e| anyhow!("Invalid NETWORTH_TIMEZONE '{}': {}", timezone, e))?,
            lookup_timeout_ms: parse(
                "NETWORTH_LOOKUP_TIMEOUT_MS",
                &var("NETWORTH_LOOKUP_TIMEOUT_MS", "5000"),
            )?,
            lookup_max_attempts: parse(
                "NETWORTH_LOOKUP_MAX_ATTEMPTS",
                &var("NETWORTH_LOOKUP_MAX_ATTEMPTS", "3"),
            )?,
        };

        if config.fallback_usd_twd <= Decimal::ZERO {
            return Err(anyhow!("NETWORTH_FALLBACK_USD_TWD must be positive"));
        }
        if config.lookup_max_attempts == 0 {
            return Err(anyhow!("NETWORTH_LOOKUP_MAX_ATTEMPTS must be at least 1"));
        }
        Ok(config)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            lookback_days: self.lookback_days,
            fallback_usd_twd: self.fallback_usd_twd,
            timezone: self.timezone,
            snapshot_time: self.snapshot_time,
            lookup: LookupSettings {
                timeout_ms: self.lookup_timeout_ms,
                max_attempts: self.lookup_max_attempts,
                ..LookupSettings::default()
            },
        }
    }
}

fn parse<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| anyhow!("Invalid {} '{}': {}", key, raw, e))
}

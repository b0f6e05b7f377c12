//! Bounded lookups: per-attempt timeout, a fixed number of attempts and
//! exponential backoff with full jitter between them.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, warn};
use rand::Rng;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::market_data_model::Observation;
use super::market_data_traits::MarketDataProviderTrait;
use crate::assets::AssetClass;
use crate::errors::Result;
use crate::settings::LookupSettings;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    pub timeout: Duration,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// `min(max_delay, base_delay * 2^(attempt-1))` with jitter in `[0, capped)`.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let capped = self.capped_backoff_ms(attempt);
        if capped == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..capped)
        }
    }

    fn capped_backoff_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1);
        let multiplier = if exponent >= 32 { u64::MAX } else { 1u64 << exponent };
        self.base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms)
    }
}

impl From<&LookupSettings> for RetryPolicy {
    fn from(settings: &LookupSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            timeout: settings.timeout(),
            base_delay_ms: settings.base_delay_ms,
            max_delay_ms: settings.max_delay_ms,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&LookupSettings::default())
    }
}

/// Wraps a provider so that no lookup hangs or fails the caller: after the
/// last attempt the value is reported as unavailable.
pub struct ResilientMarketData {
    inner: Arc<dyn MarketDataProviderTrait>,
    policy: RetryPolicy,
}

impl ResilientMarketData {
    pub fn new(inner: Arc<dyn MarketDataProviderTrait>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn bounded<T, F, Fut>(&self, what: &str, mut call: F) -> Result<Option<T>>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        for attempt in 1..=self.policy.max_attempts {
            match tokio::time::timeout(self.policy.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    warn!(
                        "Lookup of {} failed (attempt {}/{}): {}",
                        what, attempt, self.policy.max_attempts, e
                    );
                }
                Err(_) => {
                    warn!(
                        "Lookup of {} timed out after {:?} (attempt {}/{})",
                        what, self.policy.timeout, attempt, self.policy.max_attempts
                    );
                }
            }

            if attempt < self.policy.max_attempts {
                let delay = self.policy.backoff_ms(attempt);
                debug!("Retrying {} in {}ms", what, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        warn!(
            "Giving up on {} after {} attempts; treating as unavailable",
            what, self.policy.max_attempts
        );
        Ok(None)
    }
}

#[async_trait]
impl MarketDataProviderTrait for ResilientMarketData {
    async fn price_lookup(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        date: Option<NaiveDate>,
    ) -> Result<Option<Decimal>> {
        let what = format!("price {} {:?}", symbol, date);
        self.bounded(&what, || self.inner.price_lookup(symbol, asset_class, date))
            .await
    }

    async fn fx_lookup(&self, pair: &str, date: Option<NaiveDate>) -> Result<Option<Decimal>> {
        let what = format!("fx {} {:?}", pair, date);
        self.bounded(&what, || self.inner.fx_lookup(pair, date)).await
    }

    async fn price_on_or_before(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Option<Observation>> {
        let what = format!("price {} on or before {}", symbol, date);
        self.bounded(&what, || {
            self.inner
                .price_on_or_before(symbol, asset_class, date, lookback_days)
        })
        .await
    }

    async fn fx_on_or_before(
        &self,
        pair: &str,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Option<Observation>> {
        let what = format!("fx {} on or before {}", pair, date);
        self.bounded(&what, || self.inner.fx_on_or_before(pair, date, lookback_days))
            .await
    }
}

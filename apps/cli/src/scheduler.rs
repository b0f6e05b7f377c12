//! Daily net worth snapshot loop for the `run` command.

use chrono::Utc;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::main_lib::AppState;

/// Sleeps until the next configured snapshot time, writes the snapshot and
/// repeats until ctrl-c.
pub async fn run_daily_snapshots(state: Arc<AppState>) -> anyhow::Result<()> {
    info!(
        "Daily snapshot scheduler started ({} {})",
        state.settings.snapshot_time, state.settings.timezone
    );

    loop {
        let next = state.snapshot_task.next_run();
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        info!("Next snapshot at {} (in {}s)", next, wait.as_secs());

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                run_scheduled_snapshot(&state).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Daily snapshot scheduler stopped");
                return Ok(());
            }
        }
    }
}

/// Runs a single snapshot with fresh lookups. Failures are logged and the
/// next day is tried again.
pub async fn run_scheduled_snapshot(state: &Arc<AppState>) {
    state.market_data_cache.clear();
    match state.snapshot_task.run_once().await {
        Ok(snapshot) => {
            if snapshot.fx_fallback() || snapshot.price_fallbacks() > 0 {
                warn!(
                    "Snapshot for {} used fallbacks: fx {}, {} price(s)",
                    snapshot.date,
                    snapshot.fx_fallback(),
                    snapshot.price_fallbacks()
                );
            }
        }
        Err(e) => warn!("Scheduled snapshot failed: {}", e),
    }
}

//! Stop every assigned instance once a day.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{DailySchedule, Reconciler};

/// Sleep until each trigger of `schedule`, run the shutdown pass, then pause
/// for `buffer` before computing the next trigger.
pub async fn run_daily_shutdown_loop(
    reconciler: Arc<Reconciler>,
    schedule: DailySchedule,
    buffer: Duration,
    shutdown: CancellationToken,
) {
    let mut last_trigger = None;

    loop {
        let now = Utc::now();
        // Never fire twice for the same trigger, even if the clock lags the timer
        let next = schedule.next_after(last_trigger.map_or(now, |last| now.max(last)));
        let wait = (next - now).to_std().unwrap_or_default();

        tracing::info!(next = %next, wait_secs = wait.as_secs(), "Next daily shutdown scheduled");

        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Daily shutdown scheduler shutting down");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        last_trigger = Some(next);
        match reconciler.shutdown_all().await {
            Ok(report) => tracing::info!(
                examined = report.examined,
                stopped = report.stopped,
                failed = report.failed,
                "Daily shutdown finished"
            ),
            Err(e) => tracing::error!(error = %e, "Daily shutdown failed"),
        }

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(buffer) => {}
        }
    }
}

//! Periodic inactivity sweep.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::Reconciler;

/// Sweep every `period` until `shutdown` is cancelled. A failed pass is logged
/// and retried on the next tick.
pub async fn run_inactivity_loop(
    reconciler: Arc<Reconciler>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(period = ?period, "Starting inactivity monitor");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Inactivity monitor shutting down");
                return;
            }
            _ = interval.tick() => {}
        }

        match reconciler.sweep_inactive(Utc::now()).await {
            Ok(report) if report.examined > 0 => tracing::info!(
                examined = report.examined,
                stopped = report.stopped,
                failed = report.failed,
                "Inactivity sweep finished"
            ),
            Ok(_) => tracing::debug!("Inactivity sweep found nothing to stop"),
            Err(e) => tracing::error!(error = %e, "Inactivity sweep failed"),
        }
    }
}

//! Owns the background loops and their shutdown.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{run_daily_shutdown_loop, run_inactivity_loop, DailySchedule, Reconciler};
use crate::config::Config;
use crate::errors::AppResult;

/// Timing for the two loops.
#[derive(Debug, Clone, Copy)]
pub struct JobSettings {
    pub poll_interval: Duration,
    pub schedule: DailySchedule,
    pub shutdown_buffer: Duration,
}

impl JobSettings {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self {
            poll_interval: config.inactivity_poll_interval,
            schedule: DailySchedule::new(
                config.daily_shutdown_hour,
                config.daily_shutdown_utc_offset_hours,
            )?,
            shutdown_buffer: config.shutdown_buffer,
        })
    }
}

/// Running lifecycle jobs. Dropping it without `shutdown` leaves the tasks
/// running until the runtime stops.
pub struct JobSupervisor {
    shutdown_token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl JobSupervisor {
    /// Spawn the inactivity monitor and the daily shutdown scheduler.
    pub fn start(reconciler: Arc<Reconciler>, settings: JobSettings) -> Self {
        let shutdown_token = CancellationToken::new();

        let inactivity = tokio::spawn(run_inactivity_loop(
            reconciler.clone(),
            settings.poll_interval,
            shutdown_token.clone(),
        ));
        let daily = tokio::spawn(run_daily_shutdown_loop(
            reconciler,
            settings.schedule,
            settings.shutdown_buffer,
            shutdown_token.clone(),
        ));

        tracing::info!("Lifecycle jobs started");
        Self {
            shutdown_token,
            handles: vec![inactivity, daily],
        }
    }

    /// Cancel both loops and wait for them to finish their current step.
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Lifecycle job ended abnormally");
            }
        }
        tracing::info!("Lifecycle jobs stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InstanceLocks, MockUserRepository, MockVendorApi};

    #[tokio::test]
    async fn test_supervisor_stops_promptly() {
        let mut users = MockUserRepository::new();
        users.expect_list_heartbeating().returning(|| Ok(Vec::new()));
        users.expect_list_with_instance().returning(|| Ok(Vec::new()));

        let reconciler = Arc::new(Reconciler::new(
            Arc::new(users),
            Arc::new(MockVendorApi::new()),
            InstanceLocks::new(),
            None,
            chrono::Duration::minutes(180),
        ));
        let settings = JobSettings {
            poll_interval: Duration::from_millis(10),
            schedule: DailySchedule::new(23, 8).unwrap(),
            shutdown_buffer: Duration::from_secs(60),
        };

        let supervisor = JobSupervisor::start(reconciler, settings);
        tokio::time::sleep(Duration::from_millis(30)).await;

        tokio::time::timeout(Duration::from_secs(5), supervisor.shutdown())
            .await
            .expect("jobs did not stop");
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::with_jwt_secret("test-secret-key-for-testing-only-32chars");
        let settings = JobSettings::from_config(&config).unwrap();
        assert_eq!(settings.poll_interval, Duration::from_secs(60));
        assert_eq!(settings.shutdown_buffer, Duration::from_secs(60));
    }
}

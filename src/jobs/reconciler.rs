//! Lifecycle reconciler: stops instances whose sessions went quiet, and stops
//! everything at the daily cutoff.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{User, UserChanges};
use crate::errors::{AppError, AppResult};
use crate::infra::{InstanceLocks, UserRepository, VendorApi, VendorError};

/// Outcome of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Users selected for a stop
    pub examined: usize,
    pub stopped: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: AppResult<bool>) {
        match outcome {
            Ok(true) => self.stopped += 1,
            Ok(false) => {}
            Err(_) => self.failed += 1,
        }
    }
}

pub struct Reconciler {
    users: Arc<dyn UserRepository>,
    vendor: Arc<dyn VendorApi>,
    locks: InstanceLocks,
    default_token: Option<String>,
    inactivity_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        vendor: Arc<dyn VendorApi>,
        locks: InstanceLocks,
        default_token: Option<String>,
        inactivity_timeout: Duration,
    ) -> Self {
        Self {
            users,
            vendor,
            locks,
            default_token,
            inactivity_timeout,
        }
    }

    pub fn from_config(
        users: Arc<dyn UserRepository>,
        vendor: Arc<dyn VendorApi>,
        locks: InstanceLocks,
        config: &Config,
    ) -> Self {
        Self::new(
            users,
            vendor,
            locks,
            config.vendor_bearer_token().map(str::to_string),
            Duration::minutes(config.inactivity_timeout_minutes),
        )
    }

    /// Stop every active instance whose last heartbeat is older than the timeout.
    ///
    /// Users that never sent a heartbeat are left alone.
    pub async fn sweep_inactive(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let threshold = now - self.inactivity_timeout;
        let stale: Vec<User> = self
            .users
            .list_heartbeating()
            .await?
            .into_iter()
            .filter(|u| u.is_stale(threshold))
            .collect();

        let mut report = SweepReport {
            examined: stale.len(),
            ..Default::default()
        };
        for user in stale {
            let outcome = self.stop_if(&user, |current| current.is_stale(threshold)).await;
            if let Err(e) = &outcome {
                warn!(user_id = user.id, error = %e, "Failed to stop inactive instance");
            }
            report.record(outcome);
        }
        Ok(report)
    }

    /// Stop the instance of every user that has one, whatever its recorded state.
    pub async fn shutdown_all(&self) -> AppResult<SweepReport> {
        let users = self.users.list_with_instance().await?;
        let mut report = SweepReport {
            examined: users.len(),
            ..Default::default()
        };

        for user in users {
            let outcome = self.stop_if(&user, User::has_instance).await;
            if let Err(e) = &outcome {
                warn!(user_id = user.id, error = %e, "Failed to stop instance at daily shutdown");
            }
            report.record(outcome);
        }
        Ok(report)
    }

    /// Stop `candidate`'s instance if, re-read under the instance lock, the
    /// user still has that instance and still satisfies `still_due`.
    ///
    /// `Ok(false)` means the user changed in the meantime and nothing was sent.
    async fn stop_if<P>(&self, candidate: &User, still_due: P) -> AppResult<bool>
    where
        P: Fn(&User) -> bool + Send,
    {
        let Some(instance_id) = candidate.instance_id else {
            return Ok(false);
        };
        let _guard = self.locks.acquire(instance_id).await;

        let Some(current) = self.users.find_by_id(candidate.id).await? else {
            debug!(user_id = candidate.id, "User removed before stop");
            return Ok(false);
        };
        if current.instance_id != Some(instance_id) {
            debug!(user_id = current.id, "Instance reassigned before stop");
            return Ok(false);
        }
        if !still_due(&current) {
            debug!(user_id = current.id, "User no longer due for stop");
            return Ok(false);
        }
        let Some(instance) = current.instance() else {
            return Err(AppError::internal(format!(
                "User {} holds instance {instance_id} without an instance uuid",
                current.id
            )));
        };

        let token = current
            .vendor_token(self.default_token.as_deref())
            .ok_or(AppError::from(VendorError::MissingToken))?;
        self.vendor.stop_instance(token, &instance).await?;
        self.users
            .apply(current.id, UserChanges::deactivated())
            .await?;

        info!(user_id = current.id, instance_id, "Instance stopped");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PortalAction, UserState};
    use crate::infra::vendor::ActionReceipt;
    use crate::infra::{MockUserRepository, MockVendorApi};
    use std::sync::Mutex;

    fn user(id: i32, state: UserState, heartbeat: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id,
            username: format!("user{id}"),
            email: None,
            phone: None,
            hashed_password: "hash".to_string(),
            target_url: None,
            is_admin: false,
            owner_id: Some(1),
            state,
            instance_id: Some(100 + i64::from(id)),
            instance_uuid: Some(format!("uuid-{id}")),
            bearer_token: None,
            last_heartbeat: heartbeat,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn stopped() -> Result<ActionReceipt, VendorError> {
        Ok(ActionReceipt {
            action: PortalAction::Stop,
            at: Utc::now(),
            skipped: false,
        })
    }

    fn reconciler(users: MockUserRepository, vendor: MockVendorApi) -> Reconciler {
        Reconciler::new(
            Arc::new(users),
            Arc::new(vendor),
            InstanceLocks::new(),
            Some("default".to_string()),
            Duration::minutes(180),
        )
    }

    #[tokio::test]
    async fn test_sweep_stops_stale_user() {
        let now = Utc::now();
        let stale = user(2, UserState::Active, Some(now - Duration::minutes(200)));
        let fresh = user(3, UserState::Active, Some(now - Duration::minutes(5)));

        let mut users = MockUserRepository::new();
        let listed = vec![stale.clone(), fresh];
        users
            .expect_list_heartbeating()
            .returning(move || Ok(listed.clone()));
        let reread = stale.clone();
        users
            .expect_find_by_id()
            .withf(|id| *id == 2)
            .returning(move |_| Ok(Some(reread.clone())));
        users
            .expect_apply()
            .withf(|id, changes| *id == 2 && *changes == UserChanges::deactivated())
            .times(1)
            .returning(move |_, _| {
                let mut u = stale.clone();
                u.state = UserState::Inactive;
                u.last_heartbeat = None;
                Ok(u)
            });

        let mut vendor = MockVendorApi::new();
        vendor
            .expect_stop_instance()
            .withf(|token, instance| token == "default" && instance.instance_id == 102)
            .times(1)
            .returning(|_, _| stopped());

        let report = reconciler(users, vendor).sweep_inactive(now).await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                examined: 1,
                stopped: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_sweep_ignores_missing_heartbeat() {
        let mut users = MockUserRepository::new();
        users
            .expect_list_heartbeating()
            .returning(|| Ok(vec![user(2, UserState::Active, None)]));
        users.expect_find_by_id().never();
        users.expect_apply().never();

        let mut vendor = MockVendorApi::new();
        vendor.expect_stop_instance().never();

        let report = reconciler(users, vendor)
            .sweep_inactive(Utc::now())
            .await
            .unwrap();
        assert_eq!(report.examined, 0);
    }

    #[tokio::test]
    async fn test_sweep_rechecks_under_lock() {
        let now = Utc::now();
        let stale = user(2, UserState::Active, Some(now - Duration::minutes(200)));

        let mut users = MockUserRepository::new();
        let listed = vec![stale];
        users
            .expect_list_heartbeating()
            .returning(move || Ok(listed.clone()));
        // Stopped manually between listing and locking
        users
            .expect_find_by_id()
            .returning(|_| Ok(Some(user(2, UserState::Inactive, None))));
        users.expect_apply().never();

        let mut vendor = MockVendorApi::new();
        vendor.expect_stop_instance().never();

        let report = reconciler(users, vendor).sweep_inactive(now).await.unwrap();
        assert_eq!(report.examined, 1);
        assert_eq!(report.stopped, 0);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_vendor_failure_leaves_user_untouched() {
        let now = Utc::now();
        let stale = user(2, UserState::Active, Some(now - Duration::minutes(200)));

        let mut users = MockUserRepository::new();
        let listed = vec![stale.clone()];
        users
            .expect_list_heartbeating()
            .returning(move || Ok(listed.clone()));
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stale.clone())));
        users.expect_apply().never();

        let mut vendor = MockVendorApi::new();
        vendor.expect_stop_instance().returning(|_, _| {
            Err(VendorError::Http {
                status: 503,
                body: "maintenance".to_string(),
            })
        });

        let report = reconciler(users, vendor).sweep_inactive(now).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.stopped, 0);
    }

    #[tokio::test]
    async fn test_shutdown_all_isolates_failures() {
        let all = vec![
            user(2, UserState::Active, None),
            user(3, UserState::Inactive, None),
            user(4, UserState::Active, Some(Utc::now())),
        ];

        let mut users = MockUserRepository::new();
        let listed = all.clone();
        users
            .expect_list_with_instance()
            .returning(move || Ok(listed.clone()));
        let by_id = all.clone();
        users.expect_find_by_id().returning(move |id| {
            Ok(by_id.iter().find(|u| u.id == id).cloned())
        });
        let applied = Arc::new(Mutex::new(Vec::new()));
        let sink = applied.clone();
        users.expect_apply().returning(move |id, _| {
            sink.lock().unwrap().push(id);
            let mut u = user(id, UserState::Inactive, None);
            u.last_heartbeat = None;
            Ok(u)
        });

        let mut vendor = MockVendorApi::new();
        vendor.expect_stop_instance().returning(|_, instance| {
            if instance.instance_id == 103 {
                Err(VendorError::MissingData)
            } else {
                stopped()
            }
        });

        let report = reconciler(users, vendor).shutdown_all().await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                examined: 3,
                stopped: 2,
                failed: 1
            }
        );

        let mut ids = applied.lock().unwrap().clone();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_missing_token_counts_as_failure() {
        let all = vec![user(2, UserState::Active, None)];
        let mut users = MockUserRepository::new();
        let listed = all.clone();
        users
            .expect_list_with_instance()
            .returning(move || Ok(listed.clone()));
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(all[0].clone())));
        users.expect_apply().never();

        let mut vendor = MockVendorApi::new();
        vendor.expect_stop_instance().never();

        let reconciler = Reconciler::new(
            Arc::new(users),
            Arc::new(vendor),
            InstanceLocks::new(),
            None,
            Duration::minutes(180),
        );
        let report = reconciler.shutdown_all().await.unwrap();
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_binding_without_uuid_counts_as_failure() {
        let mut broken = user(2, UserState::Active, None);
        broken.instance_uuid = None;

        let mut users = MockUserRepository::new();
        let listed = vec![broken.clone()];
        users
            .expect_list_with_instance()
            .returning(move || Ok(listed.clone()));
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(broken.clone())));
        users.expect_apply().never();

        let mut vendor = MockVendorApi::new();
        vendor.expect_stop_instance().never();

        let report = reconciler(users, vendor).shutdown_all().await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                examined: 1,
                stopped: 0,
                failed: 1
            }
        );
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_passes_are_sendable() {
        let reconciler = reconciler(MockUserRepository::new(), MockVendorApi::new());
        assert_send(&reconciler.shutdown_all());
        assert_send(&reconciler.sweep_inactive(Utc::now()));
    }
}

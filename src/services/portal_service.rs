//! Portal service - the end-user view of one assigned GPU instance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::domain::{InstanceBinding, PortalAction, User, UserChanges, UserState};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{InstanceLocks, UnitOfWork, VendorApi, VendorError};

/// Result of a start or stop request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActionOutcome {
    pub success: bool,
    #[schema(example = "Instance started")]
    pub message: String,
    pub action: PortalAction,
    /// Notebook address, returned on start
    pub target_url: Option<String>,
    pub state: UserState,
    /// Already in the requested state; no command was sent
    pub skipped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HeartbeatAck {
    pub last_heartbeat: DateTime<Utc>,
}

/// Live status of the caller's instance
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InstanceStatusView {
    /// Raw provider code: 3 running, 5 stopped
    #[schema(example = 3)]
    pub status: i32,
    pub is_running: bool,
    pub jupyter_url: Option<String>,
    pub target_url: Option<String>,
    pub state: UserState,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TargetView {
    pub target_url: Option<String>,
    pub state: UserState,
}

/// Portal service trait for dependency injection.
#[async_trait]
pub trait PortalService: Send + Sync {
    /// Start or stop the caller's instance
    async fn perform_action(&self, user_id: i32, action: PortalAction) -> AppResult<ActionOutcome>;

    /// Record that the caller's session is alive
    async fn heartbeat(&self, user_id: i32) -> AppResult<HeartbeatAck>;

    /// Ask the provider and sync the stored state
    async fn instance_status(&self, user_id: i32) -> AppResult<InstanceStatusView>;

    async fn target(&self, user_id: i32) -> AppResult<TargetView>;
}

/// Concrete implementation of PortalService.
pub struct Portal<U: UnitOfWork> {
    uow: Arc<U>,
    vendor: Arc<dyn VendorApi>,
    locks: InstanceLocks,
    default_token: Option<String>,
}

impl<U: UnitOfWork> Portal<U> {
    pub fn new(
        uow: Arc<U>,
        vendor: Arc<dyn VendorApi>,
        locks: InstanceLocks,
        default_token: Option<String>,
    ) -> Self {
        Self {
            uow,
            vendor,
            locks,
            default_token,
        }
    }

    async fn load(&self, user_id: i32) -> AppResult<User> {
        self.uow
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_not_found("User")
    }

    fn assigned(user: &User) -> AppResult<InstanceBinding> {
        user.instance()
            .ok_or_else(|| AppError::bad_request("No GPU instance is assigned to this account"))
    }

    fn token_for(&self, user: &User) -> AppResult<String> {
        user.vendor_token(self.default_token.as_deref())
            .map(str::to_string)
            .ok_or_else(|| VendorError::MissingToken.into())
    }
}

#[async_trait]
impl<U: UnitOfWork> PortalService for Portal<U> {
    async fn perform_action(&self, user_id: i32, action: PortalAction) -> AppResult<ActionOutcome> {
        let locked = Self::assigned(&self.load(user_id).await?)?;
        let _guard = self.locks.acquire(locked.instance_id).await;

        // Re-read under the lock: the assignment may have changed while waiting
        let user = self.load(user_id).await?;
        let instance = Self::assigned(&user)?;
        if instance != locked {
            return Err(AppError::conflict("Instance assignment changed, please retry"));
        }
        let token = self.token_for(&user)?;

        let receipt = match action {
            PortalAction::Start => self.vendor.start_instance(&token, &instance).await?,
            PortalAction::Stop => self.vendor.stop_instance(&token, &instance).await?,
        };

        let changes = match action {
            PortalAction::Start => UserChanges::activated(),
            PortalAction::Stop => UserChanges::deactivated(),
        };
        let user = self.uow.users().apply(user.id, changes).await?;

        tracing::info!(
            user_id,
            instance_id = instance.instance_id,
            %action,
            skipped = receipt.skipped,
            "Portal action completed"
        );

        let message = match (action, receipt.skipped) {
            (PortalAction::Start, false) => "Instance started",
            (PortalAction::Start, true) => "Instance is already running",
            (PortalAction::Stop, false) => "Instance stopped",
            (PortalAction::Stop, true) => "Instance is already stopped",
        };

        Ok(ActionOutcome {
            success: true,
            message: message.to_string(),
            action,
            target_url: match action {
                PortalAction::Start => user.target_url.clone(),
                PortalAction::Stop => None,
            },
            state: user.state,
            skipped: receipt.skipped,
        })
    }

    async fn heartbeat(&self, user_id: i32) -> AppResult<HeartbeatAck> {
        let now = Utc::now();
        let user = self
            .uow
            .users()
            .apply(user_id, UserChanges::heartbeat(now))
            .await?;
        tracing::debug!(user_id, "Heartbeat");
        Ok(HeartbeatAck {
            last_heartbeat: user.last_heartbeat.unwrap_or(now),
        })
    }

    async fn instance_status(&self, user_id: i32) -> AppResult<InstanceStatusView> {
        let mut user = self.load(user_id).await?;
        let instance = Self::assigned(&user)?;
        let token = self.token_for(&user)?;

        let report = self
            .vendor
            .instance_status(&token, instance.instance_id)
            .await?
            .ok_or_not_found("Instance at the GPU provider")?;

        let changes = match report.status.implied_state() {
            Some(UserState::Inactive) if user.is_active() => Some(UserChanges::deactivated()),
            Some(UserState::Active) if !user.is_active() => Some(UserChanges::state(UserState::Active)),
            _ => None,
        };
        if let Some(changes) = changes {
            user = self.uow.users().apply(user.id, changes).await?;
            tracing::info!(user_id, state = %user.state, "State synced from provider");
        }

        Ok(InstanceStatusView {
            status: report.status.code(),
            is_running: report.status.is_running(),
            jupyter_url: report.jupyter_url,
            target_url: user.target_url,
            state: user.state,
        })
    }

    async fn target(&self, user_id: i32) -> AppResult<TargetView> {
        let user = self.load(user_id).await?;
        Ok(TargetView {
            target_url: user.target_url,
            state: user.state,
        })
    }
}

//! Instance run state as reported by the provider, and the actions users can request.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{VENDOR_STATUS_RUNNING, VENDOR_STATUS_STOPPED};

use super::user::UserState;

/// Provider status code, interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Running,
    Stopped,
    Unknown(i32),
}

impl InstanceStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            VENDOR_STATUS_RUNNING => InstanceStatus::Running,
            VENDOR_STATUS_STOPPED => InstanceStatus::Stopped,
            other => InstanceStatus::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            InstanceStatus::Running => VENDOR_STATUS_RUNNING,
            InstanceStatus::Stopped => VENDOR_STATUS_STOPPED,
            InstanceStatus::Unknown(code) => *code,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, InstanceStatus::Running)
    }

    /// Portal state implied by this status; transitional codes imply nothing.
    pub fn implied_state(&self) -> Option<UserState> {
        match self {
            InstanceStatus::Running => Some(UserState::Active),
            InstanceStatus::Stopped => Some(UserState::Inactive),
            InstanceStatus::Unknown(_) => None,
        }
    }
}

/// Start or stop request from the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PortalAction {
    Start,
    Stop,
}

impl PortalAction {
    /// Wire value the provider expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            PortalAction::Start => "start",
            PortalAction::Stop => "stop",
        }
    }

    /// Status the instance reaches once the action completes.
    pub fn target_status(&self) -> InstanceStatus {
        match self {
            PortalAction::Start => InstanceStatus::Running,
            PortalAction::Stop => InstanceStatus::Stopped,
        }
    }
}

impl std::fmt::Display for PortalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

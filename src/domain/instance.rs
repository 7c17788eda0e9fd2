//! GPU instance registry entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Provider identity of an instance, as copied onto the owning user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceBinding {
    pub instance_id: i64,
    pub instance_uuid: String,
}

/// Registered provider instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuInstance {
    pub id: i32,
    /// Numeric id at the provider
    pub instance_id: i64,
    pub instance_uuid: String,
    pub nickname: String,
    pub target_url: Option<String>,
    /// At most one user per instance
    pub assigned_user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GpuInstance {
    pub fn binding(&self) -> InstanceBinding {
        InstanceBinding {
            instance_id: self.instance_id,
            instance_uuid: self.instance_uuid.clone(),
        }
    }
}

/// Admin input for registering an instance.
#[derive(Debug, Clone, Default)]
pub struct NewInstance {
    pub instance_uuid: String,
    pub nickname: String,
    pub target_url: Option<String>,
    /// Token used for the provider lookup; falls back to the default token.
    pub bearer_token: Option<String>,
}

/// Row to insert once the provider id has been resolved.
#[derive(Debug, Clone)]
pub struct NewInstanceRecord {
    pub instance_id: i64,
    pub instance_uuid: String,
    pub nickname: String,
    pub target_url: Option<String>,
}

/// Editable registry fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceChanges {
    pub nickname: Option<String>,
    pub target_url: Option<Option<String>>,
}

impl InstanceChanges {
    pub fn is_empty(&self) -> bool {
        self.nickname.is_none() && self.target_url.is_none()
    }
}

/// Registry row returned to administrators
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InstanceResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = 7764)]
    pub instance_id: i64,
    #[schema(example = "gghcmwa6-emgm7485")]
    pub instance_uuid: String,
    #[schema(example = "lab-a100-01")]
    pub nickname: String,
    pub target_url: Option<String>,
    pub assigned_user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GpuInstance> for InstanceResponse {
    fn from(instance: GpuInstance) -> Self {
        Self {
            id: instance.id,
            instance_id: instance.instance_id,
            instance_uuid: instance.instance_uuid,
            nickname: instance.nickname,
            target_url: instance.target_url,
            assigned_user_id: instance.assigned_user_id,
            created_at: instance.created_at,
            updated_at: instance.updated_at,
        }
    }
}

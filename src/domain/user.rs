//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{STATE_ACTIVE, STATE_INACTIVE};

use super::instance::InstanceBinding;

/// Whether a user's instance is considered running by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    Active,
    Inactive,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Active => STATE_ACTIVE,
            UserState::Inactive => STATE_INACTIVE,
        }
    }
}

impl From<&str> for UserState {
    fn from(s: &str) -> Self {
        match s {
            STATE_ACTIVE => UserState::Active,
            _ => UserState::Inactive,
        }
    }
}

impl std::fmt::Display for UserState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub target_url: Option<String>,
    pub is_admin: bool,
    /// Administrator that created this account; `None` for bootstrap admins.
    pub owner_id: Option<i32>,
    pub state: UserState,
    pub instance_id: Option<i64>,
    pub instance_uuid: Option<String>,
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Assigned provider instance, if both halves of the identity are present.
    pub fn instance(&self) -> Option<InstanceBinding> {
        match (self.instance_id, self.instance_uuid.as_ref()) {
            (Some(instance_id), Some(instance_uuid)) => Some(InstanceBinding {
                instance_id,
                instance_uuid: instance_uuid.clone(),
            }),
            _ => None,
        }
    }

    pub fn has_instance(&self) -> bool {
        self.instance_id.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.state == UserState::Active
    }

    /// Token used against the provider: the user's own, else the fallback.
    ///
    /// Blank tokens count as absent.
    pub fn vendor_token<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
        self.bearer_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| fallback.map(str::trim).filter(|t| !t.is_empty()))
    }

    /// Active with an instance and a heartbeat older than `threshold`.
    ///
    /// A missing heartbeat is never stale.
    pub fn is_stale(&self, threshold: DateTime<Utc>) -> bool {
        self.is_active()
            && self.has_instance()
            && self.last_heartbeat.is_some_and(|hb| hb < threshold)
    }

    /// The actor is this user or the administrator that created it.
    pub fn is_managed_by(&self, actor_id: i32) -> bool {
        self.id == actor_id || self.owner_id == Some(actor_id)
    }
}

/// Input for account creation, after request validation.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub target_url: Option<String>,
    pub is_admin: bool,
    pub gpu_instance_id: Option<i32>,
    pub bearer_token: Option<String>,
}

/// Partial account update.
///
/// Outer `None` leaves a field alone; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub target_url: Option<Option<String>>,
    pub is_admin: Option<bool>,
    pub bearer_token: Option<Option<String>>,
    pub state: Option<UserState>,
    pub gpu_instance_id: Option<Option<i32>>,
}

/// Row to insert for a new account.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub username: String,
    pub hashed_password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub target_url: Option<String>,
    pub is_admin: bool,
    pub owner_id: Option<i32>,
    pub instance: Option<InstanceBinding>,
    pub bearer_token: Option<String>,
}

/// Resolved column changes applied by the repositories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub hashed_password: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub target_url: Option<Option<String>>,
    pub is_admin: Option<bool>,
    pub bearer_token: Option<Option<String>>,
    pub state: Option<UserState>,
    pub instance: Option<Option<InstanceBinding>>,
    pub last_heartbeat: Option<Option<DateTime<Utc>>>,
    pub last_login: Option<Option<DateTime<Utc>>>,
}

impl UserChanges {
    /// Instance started: active. The heartbeat is kept, so repeated starts
    /// cannot reopen the grace window of a running session.
    pub fn activated() -> Self {
        Self::state(UserState::Active)
    }

    /// Instance stopped: inactive, heartbeat cleared.
    pub fn deactivated() -> Self {
        Self {
            state: Some(UserState::Inactive),
            last_heartbeat: Some(None),
            ..Default::default()
        }
    }

    pub fn state(state: UserState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    pub fn heartbeat(at: DateTime<Utc>) -> Self {
        Self {
            last_heartbeat: Some(Some(at)),
            ..Default::default()
        }
    }

    pub fn login(at: DateTime<Utc>) -> Self {
        Self {
            last_login: Some(Some(at)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 2)]
    pub id: i32,
    #[schema(example = "demo")]
    pub username: String,
    #[schema(example = "demo@example.com")]
    pub email: Option<String>,
    #[schema(example = "+8613800000000")]
    pub phone: Option<String>,
    #[schema(example = "https://notebook.example.com/lab")]
    pub target_url: Option<String>,
    pub is_admin: bool,
    pub owner_id: Option<i32>,
    pub state: UserState,
    #[schema(example = 7764)]
    pub instance_id: Option<i64>,
    #[schema(example = "gghcmwa6-emgm7485")]
    pub instance_uuid: Option<String>,
    /// Whether a per-user provider token is stored (the token itself is never returned)
    pub has_bearer_token: bool,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let has_bearer_token = user
            .bearer_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            target_url: user.target_url,
            is_admin: user.is_admin,
            owner_id: user.owner_id,
            state: user.state,
            instance_id: user.instance_id,
            instance_uuid: user.instance_uuid,
            has_bearer_token,
            last_heartbeat: user.last_heartbeat,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 2,
            username: "bob".to_string(),
            email: None,
            phone: None,
            hashed_password: "hash".to_string(),
            target_url: None,
            is_admin: false,
            owner_id: Some(1),
            state: UserState::Active,
            instance_id: Some(42),
            instance_uuid: Some("uuid-x".to_string()),
            bearer_token: None,
            last_heartbeat: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_state_round_trips_through_storage_value() {
        assert_eq!(UserState::from(UserState::Active.as_str()), UserState::Active);
        assert_eq!(UserState::from("inactive"), UserState::Inactive);
        assert_eq!(UserState::from("garbage"), UserState::Inactive);
    }

    #[test]
    fn test_null_heartbeat_is_never_stale() {
        let u = user();
        assert!(!u.is_stale(Utc::now()));
    }

    #[test]
    fn test_old_heartbeat_is_stale() {
        let mut u = user();
        let now = Utc::now();
        u.last_heartbeat = Some(now - Duration::minutes(200));
        assert!(u.is_stale(now - Duration::minutes(180)));

        u.last_heartbeat = Some(now - Duration::minutes(10));
        assert!(!u.is_stale(now - Duration::minutes(180)));
    }

    #[test]
    fn test_inactive_or_unassigned_is_not_stale() {
        let now = Utc::now();
        let mut u = user();
        u.last_heartbeat = Some(now - Duration::days(1));
        u.state = UserState::Inactive;
        assert!(!u.is_stale(now));

        let mut u = user();
        u.last_heartbeat = Some(now - Duration::days(1));
        u.instance_id = None;
        assert!(!u.is_stale(now));
    }

    #[test]
    fn test_vendor_token_prefers_own_and_skips_blank() {
        let mut u = user();
        assert_eq!(u.vendor_token(Some("default")), Some("default"));

        u.bearer_token = Some("  ".to_string());
        assert_eq!(u.vendor_token(Some("default")), Some("default"));

        u.bearer_token = Some(" own ".to_string());
        assert_eq!(u.vendor_token(Some("default")), Some("own"));

        u.bearer_token = None;
        assert_eq!(u.vendor_token(None), None);
    }

    #[test]
    fn test_managed_by_self_or_owner() {
        let u = user();
        assert!(u.is_managed_by(2));
        assert!(u.is_managed_by(1));
        assert!(!u.is_managed_by(3));
    }

    #[test]
    fn test_response_hides_token() {
        let mut u = user();
        u.bearer_token = Some("secret".to_string());
        let response = UserResponse::from(u);
        assert!(response.has_bearer_token);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_changes_helpers() {
        assert!(UserChanges::default().is_empty());
        let stop = UserChanges::deactivated();
        assert_eq!(stop.state, Some(UserState::Inactive));
        assert_eq!(stop.last_heartbeat, Some(None));
        assert!(!stop.is_empty());

        let start = UserChanges::activated();
        assert_eq!(start.state, Some(UserState::Active));
        assert_eq!(start.last_heartbeat, None);
    }
}

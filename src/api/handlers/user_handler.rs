//! User management handlers (administrators only).

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::get,
    Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidateEmail, ValidateUrl, ValidationError};

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{require_admin, CurrentUser};
use crate::api::AppState;
use crate::domain::{NewUser, UserPatch, UserResponse, UserState};
use crate::errors::{AppError, AppResult};
use crate::services::UserCount;
use crate::types::{Created, MessageResponse};

static PHONE_REGEX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\+?[0-9]{6,20}$").ok());

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_REGEX.as_ref().is_some_and(|re| re.is_match(phone)) {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message("Invalid phone number".into()))
    }
}

/// Trimmed value, `None` when blank.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Nullable patch field: a blank string clears it.
fn nullable(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(non_blank)
}

/// User creation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    #[schema(example = "bob")]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "SecurePass123!", min_length = 8)]
    pub password: String,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "bob@example.com")]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    #[schema(example = "+8613800000000")]
    pub phone: Option<String>,
    #[validate(url(message = "Invalid target URL"))]
    #[schema(example = "https://lab.example.com")]
    pub target_url: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    /// Registry id of the instance to assign
    #[schema(example = 1)]
    pub gpu_instance_id: Option<i32>,
    /// Per-user provider token; the default token is used when absent
    pub bearer_token: Option<String>,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            username: req.username.trim().to_string(),
            password: req.password,
            email: non_blank(req.email),
            phone: non_blank(req.phone),
            target_url: non_blank(req.target_url),
            is_admin: req.is_admin,
            gpu_instance_id: req.gpu_instance_id,
            bearer_token: non_blank(req.bearer_token),
        }
    }
}

/// Partial user update.
///
/// Omitted fields are left alone; `null` clears a nullable field.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub target_url: Option<Option<String>>,
    pub is_admin: Option<bool>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub bearer_token: Option<Option<String>>,
    /// Recorded session state; reassignment overrides it with `inactive`
    pub state: Option<UserState>,
    /// Registry id to assign, or `null` to release the current instance
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub gpu_instance_id: Option<Option<i32>>,
}

impl UpdateUserRequest {
    /// Checks for the nullable fields, which the derive does not see through.
    fn check_nullable(&self) -> AppResult<()> {
        if let Some(Some(email)) = &self.email {
            if !email.trim().is_empty() && !email.trim().validate_email() {
                return Err(AppError::validation("Invalid email format"));
            }
        }
        if let Some(Some(phone)) = &self.phone {
            if !phone.trim().is_empty() && validate_phone(phone.trim()).is_err() {
                return Err(AppError::validation("Invalid phone number"));
            }
        }
        if let Some(Some(url)) = &self.target_url {
            if !url.trim().is_empty() && !url.trim().validate_url() {
                return Err(AppError::validation("Invalid target URL"));
            }
        }
        Ok(())
    }
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            username: req.username.map(|u| u.trim().to_string()),
            password: req.password,
            email: nullable(req.email),
            phone: nullable(req.phone),
            target_url: nullable(req.target_url),
            is_admin: req.is_admin,
            bearer_token: nullable(req.bearer_token),
            state: req.state,
            gpu_instance_id: req.gpu_instance_id,
        }
    }
}

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/count", get(count_users))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

/// List the caller and the users it created
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Visible users", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn list_users(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserResponse>>> {
    require_admin(&current_user)?;
    let users = state.user_service.list_users(current_user.id).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Number of users created by the caller, and the cap
#[utoipa::path(
    get,
    path = "/api/users/count",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Owned user count", body = UserCount),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn count_users(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<UserCount>> {
    require_admin(&current_user)?;
    Ok(Json(state.user_service.count_users(current_user.id).await?))
}

/// Create a user owned by the caller
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error or user limit reached"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "Instance not found"),
        (status = 409, description = "Duplicate username, email or phone, or instance already assigned")
    )
)]
pub async fn create_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<Created<UserResponse>> {
    require_admin(&current_user)?;

    let input = NewUser::from(payload);
    if input.username.is_empty() {
        return Err(AppError::validation("Username is required"));
    }

    let user = state
        .user_service
        .create_user(current_user.id, input)
        .await?;
    Ok(Created(UserResponse::from(user)))
}

/// Get a user the caller manages
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Not one of the caller's users"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<UserResponse>> {
    require_admin(&current_user)?;
    let user = state.user_service.get_user(current_user.id, id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Update a user the caller manages
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not one of the caller's users"),
        (status = 404, description = "User or instance not found"),
        (status = 409, description = "Duplicate value or instance already assigned")
    )
)]
pub async fn update_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    require_admin(&current_user)?;
    payload.check_nullable()?;

    let patch = UserPatch::from(payload);
    if patch.username.as_deref() == Some("") {
        return Err(AppError::validation("Username is required"));
    }

    let user = state
        .user_service
        .update_user(current_user.id, id, patch)
        .await?;
    Ok(Json(UserResponse::from(user)))
}

/// Delete a user the caller created
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Cannot delete yourself, or the user still owns users"),
        (status = 403, description = "Not created by the caller"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    require_admin(&current_user)?;
    state.user_service.delete_user(current_user.id, id).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}

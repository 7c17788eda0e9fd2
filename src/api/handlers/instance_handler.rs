//! GPU instance registry handlers (administrators only).

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidateUrl};

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{require_admin, CurrentUser};
use crate::api::AppState;
use crate::domain::{InstanceChanges, InstanceResponse, NewInstance};
use crate::errors::{AppError, AppResult};
use crate::infra::vendor::{ListQuery, VendorInstance};
use crate::types::{Created, MessageResponse, Paginated, PaginationParams};

/// Register an instance by its provider uuid
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInstanceRequest {
    #[validate(length(min = 1, message = "Instance UUID is required"))]
    #[schema(example = "gghcmwa6-emgm7485")]
    pub instance_uuid: String,
    #[validate(length(min = 1, max = 128, message = "Nickname must be 1-128 characters"))]
    #[schema(example = "lab-a100-01")]
    pub nickname: String,
    #[validate(url(message = "Invalid target URL"))]
    pub target_url: Option<String>,
    /// Token for the lookup; the default token is used when absent
    pub bearer_token: Option<String>,
}

/// Registry fields to change; `null` clears the target URL
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateInstanceRequest {
    #[validate(length(min = 1, max = 128, message = "Nickname must be 1-128 characters"))]
    pub nickname: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub target_url: Option<Option<String>>,
}

impl UpdateInstanceRequest {
    fn into_changes(self) -> AppResult<InstanceChanges> {
        let target_url = self
            .target_url
            .map(|url| url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()));
        if let Some(Some(url)) = &target_url {
            if !url.as_str().validate_url() {
                return Err(AppError::validation("Invalid target URL"));
            }
        }
        Ok(InstanceChanges {
            nickname: self.nickname.map(|n| n.trim().to_string()),
            target_url,
        })
    }
}

/// Provider listing filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VendorFilter {
    /// Provider status code (3 running, 5 stopped)
    pub status: Option<i32>,
    pub nick_name: Option<String>,
}

/// Create instance registry routes
pub fn instance_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_instances).post(create_instance))
        .route("/available", get(list_available))
        .route("/vendor", get(browse_vendor))
        .route("/:id", axum::routing::put(update_instance).delete(delete_instance))
}

/// List every registered instance
#[utoipa::path(
    get,
    path = "/api/instances",
    tag = "Instances",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registered instances", body = Vec<InstanceResponse>),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn list_instances(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<InstanceResponse>>> {
    require_admin(&current_user)?;
    let instances = state.instance_service.list_instances().await?;
    Ok(Json(instances.into_iter().map(InstanceResponse::from).collect()))
}

/// List instances not assigned to any user
#[utoipa::path(
    get,
    path = "/api/instances/available",
    tag = "Instances",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unassigned instances", body = Vec<InstanceResponse>),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn list_available(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<InstanceResponse>>> {
    require_admin(&current_user)?;
    let instances = state.instance_service.list_available().await?;
    Ok(Json(instances.into_iter().map(InstanceResponse::from).collect()))
}

/// Register an instance after resolving it at the provider
#[utoipa::path(
    post,
    path = "/api/instances",
    tag = "Instances",
    security(("bearer_auth" = [])),
    request_body = CreateInstanceRequest,
    responses(
        (status = 201, description = "Instance registered", body = InstanceResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Unknown at the provider"),
        (status = 409, description = "Already registered"),
        (status = 502, description = "Provider error")
    )
)]
pub async fn create_instance(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateInstanceRequest>,
) -> AppResult<Created<InstanceResponse>> {
    require_admin(&current_user)?;

    let instance_uuid = payload.instance_uuid.trim().to_string();
    let nickname = payload.nickname.trim().to_string();
    if instance_uuid.is_empty() || nickname.is_empty() {
        return Err(AppError::validation("Instance UUID and nickname are required"));
    }

    let instance = state
        .instance_service
        .register(NewInstance {
            instance_uuid,
            nickname,
            target_url: payload
                .target_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            bearer_token: payload.bearer_token,
        })
        .await?;
    Ok(Created(InstanceResponse::from(instance)))
}

/// Change nickname or target URL
#[utoipa::path(
    put,
    path = "/api/instances/{id}",
    tag = "Instances",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Registry ID")),
    request_body = UpdateInstanceRequest,
    responses(
        (status = 200, description = "Instance updated", body = InstanceResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn update_instance(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<UpdateInstanceRequest>,
) -> AppResult<Json<InstanceResponse>> {
    require_admin(&current_user)?;
    let changes = payload.into_changes()?;
    let instance = state.instance_service.update_instance(id, changes).await?;
    Ok(Json(InstanceResponse::from(instance)))
}

/// Remove an unassigned instance
#[utoipa::path(
    delete,
    path = "/api/instances/{id}",
    tag = "Instances",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Registry ID")),
    responses(
        (status = 200, description = "Instance deleted", body = MessageResponse),
        (status = 404, description = "Instance not found"),
        (status = 409, description = "Instance is assigned")
    )
)]
pub async fn delete_instance(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    require_admin(&current_user)?;
    state.instance_service.delete_instance(id).await?;
    Ok(Json(MessageResponse::new("Instance deleted")))
}

/// Browse the provider listing with the default token
#[utoipa::path(
    get,
    path = "/api/instances/vendor",
    tag = "Instances",
    security(("bearer_auth" = [])),
    params(PaginationParams, VendorFilter),
    responses(
        (status = 200, description = "One page of the provider listing", body = crate::types::VendorListing),
        (status = 502, description = "Provider error")
    )
)]
pub async fn browse_vendor(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<VendorFilter>,
) -> AppResult<Json<Paginated<VendorInstance>>> {
    require_admin(&current_user)?;

    let page = pagination.page();
    let per_page = pagination.limit();
    let query = ListQuery {
        page_no: u32::try_from(page).unwrap_or(u32::MAX),
        page_size: u32::try_from(per_page).unwrap_or(u32::MAX),
        status: filter.status,
        nick_name: filter
            .nick_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
    };

    let listing = state.instance_service.browse_vendor(query).await?;
    Ok(Json(Paginated::new(listing.instances, page, per_page, listing.total)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_clears_blank_target() {
        let req: UpdateInstanceRequest = serde_json::from_str(r#"{"target_url": ""}"#).unwrap();
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.target_url, Some(None));
        assert_eq!(changes.nickname, None);
    }

    #[test]
    fn test_update_rejects_bad_url() {
        let req: UpdateInstanceRequest =
            serde_json::from_str(r#"{"target_url": "not a url"}"#).unwrap();
        assert!(req.into_changes().is_err());
    }

    #[test]
    fn test_absent_target_is_untouched() {
        let req: UpdateInstanceRequest = serde_json::from_str(r#"{"nickname": "lab"}"#).unwrap();
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.target_url, None);
        assert_eq!(changes.nickname.as_deref(), Some("lab"));
    }
}

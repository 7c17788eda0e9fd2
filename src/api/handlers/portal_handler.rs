//! End-user portal handlers: start/stop, heartbeat and status of the
//! caller's own instance.

use axum::{
    extract::{Extension, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::PortalAction;
use crate::errors::AppResult;
use crate::services::{ActionOutcome, HeartbeatAck, InstanceStatusView, TargetView};

/// `{"action": "start"}` or `{"action": "stop"}`
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ActionRequest {
    pub action: PortalAction,
}

/// Create portal routes
pub fn portal_routes() -> Router<AppState> {
    Router::new()
        .route("/action", post(perform_action))
        .route("/heartbeat", post(heartbeat))
        .route("/status", get(instance_status))
        .route("/target-url", get(target_url))
}

/// Start or stop the caller's instance
#[utoipa::path(
    post,
    path = "/api/portal/action",
    tag = "Portal",
    security(("bearer_auth" = [])),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Action completed", body = ActionOutcome),
        (status = 400, description = "No instance assigned, or unknown action"),
        (status = 502, description = "Provider error")
    )
)]
pub async fn perform_action(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ActionRequest>,
) -> AppResult<Json<ActionOutcome>> {
    let outcome = state
        .portal_service
        .perform_action(current_user.id, payload.action)
        .await?;
    Ok(Json(outcome))
}

/// Keep the caller's session alive
#[utoipa::path(
    post,
    path = "/api/portal/heartbeat",
    tag = "Portal",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Heartbeat recorded", body = HeartbeatAck)
    )
)]
pub async fn heartbeat(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<HeartbeatAck>> {
    Ok(Json(state.portal_service.heartbeat(current_user.id).await?))
}

/// Live status of the caller's instance
#[utoipa::path(
    get,
    path = "/api/portal/status",
    tag = "Portal",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Instance status", body = InstanceStatusView),
        (status = 400, description = "No instance assigned"),
        (status = 404, description = "Instance unknown at the provider"),
        (status = 502, description = "Provider error")
    )
)]
pub async fn instance_status(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<InstanceStatusView>> {
    Ok(Json(
        state.portal_service.instance_status(current_user.id).await?,
    ))
}

/// The caller's notebook address
#[utoipa::path(
    get,
    path = "/api/portal/target-url",
    tag = "Portal",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Target URL and state", body = TargetView)
    )
)]
pub async fn target_url(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<TargetView>> {
    Ok(Json(state.portal_service.target(current_user.id).await?))
}

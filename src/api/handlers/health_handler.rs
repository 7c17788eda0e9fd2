//! Health check.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::AppState;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: &'static str,
    pub database: ServiceStatus,
    /// Number of accounts, when the database is reachable
    pub users: Option<u64>,
}

/// Individual service health status
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Database connectivity and account count
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match state.database.ping().await {
        Ok(_) => ServiceStatus {
            status: "healthy",
            error: None,
        },
        Err(e) => ServiceStatus {
            status: "unhealthy",
            error: Some(e.to_string()),
        },
    };

    if database.error.is_some() {
        let response = HealthResponse {
            status: "degraded",
            database,
            users: None,
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(response));
    }

    let users = match state.user_service.total_users().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not count users");
            None
        }
    };

    let response = HealthResponse {
        status: "healthy",
        database,
        users,
    };
    (StatusCode::OK, Json(response))
}

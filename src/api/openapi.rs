//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    auth_handler, health_handler, instance_handler, portal_handler, user_handler,
};
use crate::domain::{InstanceResponse, PortalAction, UserResponse, UserState};
use crate::infra::vendor::VendorInstance;
use crate::services::{
    ActionOutcome, HeartbeatAck, InstanceStatusView, TargetView, TokenResponse, UserCount,
};
use crate::types::{MessageResponse, PaginationMeta, VendorListing};

/// OpenAPI documentation for the GPU portal
#[derive(OpenApi)]
#[openapi(
    info(
        title = "GPU Portal",
        version = "0.1.0",
        description = "Multi-tenant admin portal for rented GPU notebook instances"
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Authentication endpoints
        auth_handler::login,
        auth_handler::me,
        // User endpoints
        user_handler::list_users,
        user_handler::count_users,
        user_handler::create_user,
        user_handler::get_user,
        user_handler::update_user,
        user_handler::delete_user,
        // Instance registry endpoints
        instance_handler::list_instances,
        instance_handler::list_available,
        instance_handler::create_instance,
        instance_handler::update_instance,
        instance_handler::delete_instance,
        instance_handler::browse_vendor,
        // Portal endpoints
        portal_handler::perform_action,
        portal_handler::heartbeat,
        portal_handler::instance_status,
        portal_handler::target_url,
        health_handler::health,
    ),
    components(
        schemas(
            // Domain types
            UserState,
            UserResponse,
            InstanceResponse,
            PortalAction,
            VendorInstance,
            // Auth types
            auth_handler::LoginRequest,
            TokenResponse,
            // User handler types
            user_handler::CreateUserRequest,
            user_handler::UpdateUserRequest,
            UserCount,
            // Instance handler types
            instance_handler::CreateInstanceRequest,
            instance_handler::UpdateInstanceRequest,
            VendorListing,
            PaginationMeta,
            // Portal types
            portal_handler::ActionRequest,
            ActionOutcome,
            HeartbeatAck,
            InstanceStatusView,
            TargetView,
            MessageResponse,
            health_handler::HealthResponse,
            health_handler::ServiceStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login and current user"),
        (name = "Users", description = "Account management for administrators"),
        (name = "Instances", description = "GPU instance registry"),
        (name = "Portal", description = "Start, stop and monitor your instance"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token obtained from /api/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

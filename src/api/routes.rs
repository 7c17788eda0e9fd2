//! Application route configuration.

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    auth_handler, auth_routes, health, instance_routes, portal_routes, user_routes,
};
use super::middleware::auth_middleware;
use super::openapi::ApiDoc;
use super::AppState;

/// CORS for the configured browser origins. Unparseable origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Create the application router with all routes configured
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(auth_handler::me))
        .nest("/users", user_routes())
        .nest("/instances", instance_routes())
        .nest("/portal", portal_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_routes())
        .merge(protected);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

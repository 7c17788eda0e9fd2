//! HTTP request handlers.

pub mod auth_handler;
pub mod health_handler;
pub mod instance_handler;
pub mod portal_handler;
pub mod user_handler;

pub use auth_handler::auth_routes;
pub use health_handler::health;
pub use instance_handler::instance_routes;
pub use portal_handler::portal_routes;
pub use user_handler::user_routes;

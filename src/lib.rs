//! GPU Portal - multi-tenant admin portal for rented GPU notebook instances
//!
//! Administrators register provider instances and hand them out to the
//! users they create; users start and stop their own instance, and
//! background jobs stop instances that went quiet or outlived the day.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core business entities and logic
//! - **services**: Application use cases and business logic
//! - **jobs**: Inactivity monitor and daily shutdown scheduler
//! - **infra**: Infrastructure concerns (database, GPU provider client, locks)
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared types (pagination, responses)
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! cargo run -- serve
//!
//! # Run migrations
//! cargo run -- migrate up
//!
//! # Create the administrator and a demo account
//! cargo run -- seed --demo --demo-password change-me-please
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod jobs;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Password, User, UserState};
pub use errors::{AppError, AppResult};

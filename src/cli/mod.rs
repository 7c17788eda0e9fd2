//! CLI module - Command-line interface for the application.
//!
//! Provides commands for:
//! - `serve` - Start the HTTP server and lifecycle jobs
//! - `migrate` - Database migrations
//! - `seed` - Create the seed administrator and demo account
//! - `vendor` - Query and drive instances at the GPU provider

pub mod args;

pub use args::{Cli, Commands};

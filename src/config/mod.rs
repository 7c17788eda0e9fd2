//! Application configuration module
//!
//! Environment-driven settings plus the constants the portal, the
//! provider client and the lifecycle jobs share.

mod constants;
mod settings;

pub use constants::*;
pub use settings::Config;

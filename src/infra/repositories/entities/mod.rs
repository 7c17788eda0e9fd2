//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod gpu_instance;
pub mod user;

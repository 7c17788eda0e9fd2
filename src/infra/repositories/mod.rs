//! Repository layer - Data access abstraction
//!
//! One repository per aggregate: accounts and the GPU instance registry.

pub(crate) mod entities;
mod instance_repository;
mod user_repository;

pub(crate) use instance_repository::queries as instance_queries;
pub use instance_repository::{InstanceRepository, InstanceStore};
pub(crate) use user_repository::queries as user_queries;
pub use user_repository::{UserRepository, UserStore};

#[cfg(any(test, feature = "test-utils"))]
pub use instance_repository::MockInstanceRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;

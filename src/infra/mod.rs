//! Infrastructure layer - External systems integration
//!
//! - Database connection, migrations and repositories
//! - Unit of Work for transaction management
//! - GPU provider HTTP client
//! - Per-instance command locks

pub mod db;
pub mod locks;
pub mod repositories;
pub mod unit_of_work;
pub mod vendor;

pub use db::{Database, Migrator};
pub use locks::InstanceLocks;
pub use repositories::{InstanceRepository, InstanceStore, UserRepository, UserStore};
pub use unit_of_work::{
    Persistence, TransactionContext, TxFuture, TxInstanceRepository, TxUserRepository, UnitOfWork,
};
pub use vendor::{GpuVendorClient, VendorApi, VendorError};

#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{MockInstanceRepository, MockUserRepository};
#[cfg(any(test, feature = "test-utils"))]
pub use vendor::MockVendorApi;

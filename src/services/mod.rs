//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion; handlers and jobs only see the traits.

mod auth_service;
pub mod bootstrap;
pub mod container;
mod instance_service;
mod portal_service;
mod user_service;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use auth_service::{AuthService, Authenticator, Claims, TokenResponse};
pub use bootstrap::{ensure_admin, seed_demo_user};
pub use instance_service::{InstanceRegistry, InstanceService};
pub use portal_service::{
    ActionOutcome, HeartbeatAck, InstanceStatusView, Portal, PortalService, TargetView,
};
pub use user_service::{UserCount, UserManager, UserService};

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use std::sync::Arc;

    use crate::errors::{AppError, AppResult};
    use crate::infra::{
        InstanceRepository, MockInstanceRepository, MockUserRepository, TransactionContext,
        TxFuture, UnitOfWork, UserRepository,
    };

    /// Unit of work over mocked repositories. Transactional paths are covered
    /// by the SQLite integration tests instead.
    pub struct MockUow {
        users: Arc<MockUserRepository>,
        instances: Arc<MockInstanceRepository>,
    }

    impl MockUow {
        pub fn new(users: MockUserRepository, instances: MockInstanceRepository) -> Arc<Self> {
            Arc::new(Self {
                users: Arc::new(users),
                instances: Arc::new(instances),
            })
        }
    }

    #[async_trait]
    impl UnitOfWork for MockUow {
        fn users(&self) -> Arc<dyn UserRepository> {
            self.users.clone()
        }

        fn instances(&self) -> Arc<dyn InstanceRepository> {
            self.instances.clone()
        }

        async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
        where
            F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
            T: Send,
        {
            Err(AppError::internal("transactions are not available on MockUow"))
        }

        async fn transaction_serializable<F, T>(&self, f: F) -> AppResult<T>
        where
            F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
            T: Send,
        {
            self.transaction(f).await
        }
    }
}

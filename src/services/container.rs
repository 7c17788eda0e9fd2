//! Service Container - Centralized service access.
//!
//! Wires one `Persistence` unit of work, the provider client and the shared
//! per-instance locks into every service, and hands out trait objects.

use std::sync::Arc;

use super::{
    AuthService, Authenticator, InstanceRegistry, InstanceService, Portal, PortalService,
    UserManager, UserService,
};
use crate::config::Config;
use crate::infra::{InstanceLocks, Persistence, VendorApi};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn users(&self) -> Arc<dyn UserService>;

    fn instances(&self) -> Arc<dyn InstanceService>;

    fn portal(&self) -> Arc<dyn PortalService>;
}

/// Concrete implementation of ServiceContainer
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    user_service: Arc<dyn UserService>,
    instance_service: Arc<dyn InstanceService>,
    portal_service: Arc<dyn PortalService>,
}

impl Services {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        user_service: Arc<dyn UserService>,
        instance_service: Arc<dyn InstanceService>,
        portal_service: Arc<dyn PortalService>,
    ) -> Self {
        Self {
            auth_service,
            user_service,
            instance_service,
            portal_service,
        }
    }

    /// Build every service over one database connection.
    ///
    /// `locks` must be the same map the lifecycle jobs use.
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        config: Config,
        vendor: Arc<dyn VendorApi>,
        locks: InstanceLocks,
    ) -> Self {
        let uow = Arc::new(Persistence::new(db));
        let default_token = config.vendor_bearer_token().map(str::to_string);

        let user_service = Arc::new(UserManager::new(uow.clone(), config.max_users_per_admin));
        let instance_service = Arc::new(InstanceRegistry::new(
            uow.clone(),
            vendor.clone(),
            default_token.clone(),
        ));
        let portal_service = Arc::new(Portal::new(uow.clone(), vendor, locks, default_token));
        let auth_service = Arc::new(Authenticator::new(uow, config));

        Self {
            auth_service,
            user_service,
            instance_service,
            portal_service,
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }

    fn instances(&self) -> Arc<dyn InstanceService> {
        self.instance_service.clone()
    }

    fn portal(&self) -> Arc<dyn PortalService> {
        self.portal_service.clone()
    }
}

//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Database, InstanceLocks, VendorApi};
use crate::services::{
    AuthService, InstanceService, PortalService, ServiceContainer, Services, UserService,
};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub instance_service: Arc<dyn InstanceService>,
    pub portal_service: Arc<dyn PortalService>,
    /// Database connection, for health checks
    pub database: Arc<Database>,
}

impl AppState {
    /// Build every service over `database`.
    ///
    /// `locks` must be shared with the lifecycle jobs so that portal actions
    /// and background stops on the same instance never overlap.
    pub fn from_config(
        database: Arc<Database>,
        config: Config,
        vendor: Arc<dyn VendorApi>,
        locks: InstanceLocks,
    ) -> Self {
        let container = Services::from_connection(database.get_connection(), config, vendor, locks);
        Self::from_container(&container, database)
    }

    pub fn from_container(container: &dyn ServiceContainer, database: Arc<Database>) -> Self {
        Self {
            auth_service: container.auth(),
            user_service: container.users(),
            instance_service: container.instances(),
            portal_service: container.portal(),
            database,
        }
    }
}

//! Instance registry service - admin management of rentable GPU instances.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{GpuInstance, InstanceChanges, NewInstance, NewInstanceRecord};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::vendor::{InstancePage, ListQuery};
use crate::infra::{UnitOfWork, VendorApi, VendorError};

/// Instance registry service trait for dependency injection.
#[async_trait]
pub trait InstanceService: Send + Sync {
    async fn list_instances(&self) -> AppResult<Vec<GpuInstance>>;

    /// Rows with no assigned user
    async fn list_available(&self) -> AppResult<Vec<GpuInstance>>;

    /// Resolve the uuid at the provider and register it
    async fn register(&self, input: NewInstance) -> AppResult<GpuInstance>;

    async fn update_instance(&self, id: i32, changes: InstanceChanges) -> AppResult<GpuInstance>;

    /// Remove an unassigned row
    async fn delete_instance(&self, id: i32) -> AppResult<()>;

    /// Page through the provider listing with the default token
    async fn browse_vendor(&self, query: ListQuery) -> AppResult<InstancePage>;
}

/// Concrete implementation of InstanceService.
pub struct InstanceRegistry<U: UnitOfWork> {
    uow: Arc<U>,
    vendor: Arc<dyn VendorApi>,
    default_token: Option<String>,
}

impl<U: UnitOfWork> InstanceRegistry<U> {
    pub fn new(uow: Arc<U>, vendor: Arc<dyn VendorApi>, default_token: Option<String>) -> Self {
        Self {
            uow,
            vendor,
            default_token,
        }
    }

    fn token<'a>(&'a self, supplied: Option<&'a str>) -> AppResult<&'a str> {
        supplied
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.default_token
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
            })
            .ok_or_else(|| VendorError::MissingToken.into())
    }
}

#[async_trait]
impl<U: UnitOfWork> InstanceService for InstanceRegistry<U> {
    async fn list_instances(&self) -> AppResult<Vec<GpuInstance>> {
        self.uow.instances().list().await
    }

    async fn list_available(&self) -> AppResult<Vec<GpuInstance>> {
        self.uow.instances().list_available().await
    }

    async fn register(&self, input: NewInstance) -> AppResult<GpuInstance> {
        let instances = self.uow.instances();
        let instance_uuid = input.instance_uuid.trim();

        if instances.find_by_uuid(instance_uuid).await?.is_some() {
            return Err(AppError::conflict("Instance UUID already registered"));
        }

        let token = self.token(input.bearer_token.as_deref())?;
        let found = self
            .vendor
            .find_by_uuid(token, instance_uuid)
            .await?
            .ok_or_not_found("Instance at the GPU provider")?;

        if instances
            .find_by_instance_id(found.instance_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Instance ID already registered"));
        }

        let instance = instances
            .insert(NewInstanceRecord {
                instance_id: found.instance_id,
                instance_uuid: instance_uuid.to_string(),
                nickname: input.nickname.trim().to_string(),
                target_url: input.target_url,
            })
            .await?;

        tracing::info!(
            id = instance.id,
            instance_id = instance.instance_id,
            "Instance registered"
        );
        Ok(instance)
    }

    async fn update_instance(&self, id: i32, changes: InstanceChanges) -> AppResult<GpuInstance> {
        self.uow.instances().update(id, changes).await
    }

    async fn delete_instance(&self, id: i32) -> AppResult<()> {
        let instances = self.uow.instances();
        if instances.delete_unassigned(id).await? == 1 {
            tracing::info!(id, "Instance deleted");
            return Ok(());
        }

        match instances.find_by_id(id).await? {
            None => Err(AppError::not_found("Instance")),
            Some(_) => Err(AppError::conflict(
                "Instance is assigned to a user; unassign it before deleting",
            )),
        }
    }

    async fn browse_vendor(&self, query: ListQuery) -> AppResult<InstancePage> {
        let token = self.token(None)?;
        Ok(self.vendor.list_instances(token, query).await?)
    }
}

//! GPU instance registry repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::entities::gpu_instance::{self, Entity as InstanceEntity};
use crate::domain::{GpuInstance, InstanceChanges, NewInstanceRecord};
use crate::errors::{AppResult, OptionExt};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Instance registry trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Find registry row by primary key
    async fn find_by_id(&self, id: i32) -> AppResult<Option<GpuInstance>>;

    /// Find registry row by provider uuid
    async fn find_by_uuid(&self, instance_uuid: &str) -> AppResult<Option<GpuInstance>>;

    /// Find registry row by provider numeric id
    async fn find_by_instance_id(&self, instance_id: i64) -> AppResult<Option<GpuInstance>>;

    /// All registry rows
    async fn list(&self) -> AppResult<Vec<GpuInstance>>;

    /// Rows with no assigned user
    async fn list_available(&self) -> AppResult<Vec<GpuInstance>>;

    /// Insert a new registry row
    async fn insert(&self, record: NewInstanceRecord) -> AppResult<GpuInstance>;

    /// Update editable fields
    async fn update(&self, id: i32, changes: InstanceChanges) -> AppResult<GpuInstance>;

    /// Delete the row only if it is unassigned; returns rows removed
    async fn delete_unassigned(&self, id: i32) -> AppResult<u64>;
}

/// SeaORM-backed instance registry
pub struct InstanceStore {
    db: DatabaseConnection,
}

impl InstanceStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InstanceRepository for InstanceStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<GpuInstance>> {
        queries::find_by_id(&self.db, id).await
    }

    async fn find_by_uuid(&self, instance_uuid: &str) -> AppResult<Option<GpuInstance>> {
        let model = InstanceEntity::find()
            .filter(gpu_instance::Column::InstanceUuid.eq(instance_uuid))
            .one(&self.db)
            .await?;
        Ok(model.map(GpuInstance::from))
    }

    async fn find_by_instance_id(&self, instance_id: i64) -> AppResult<Option<GpuInstance>> {
        let model = InstanceEntity::find()
            .filter(gpu_instance::Column::InstanceId.eq(instance_id))
            .one(&self.db)
            .await?;
        Ok(model.map(GpuInstance::from))
    }

    async fn list(&self) -> AppResult<Vec<GpuInstance>> {
        let models = InstanceEntity::find()
            .order_by_asc(gpu_instance::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(GpuInstance::from).collect())
    }

    async fn list_available(&self) -> AppResult<Vec<GpuInstance>> {
        let models = InstanceEntity::find()
            .filter(gpu_instance::Column::AssignedUserId.is_null())
            .order_by_asc(gpu_instance::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(GpuInstance::from).collect())
    }

    async fn insert(&self, record: NewInstanceRecord) -> AppResult<GpuInstance> {
        let now = Utc::now();
        let active_model = gpu_instance::ActiveModel {
            instance_id: Set(record.instance_id),
            instance_uuid: Set(record.instance_uuid),
            nickname: Set(record.nickname),
            target_url: Set(record.target_url),
            assigned_user_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await?;
        Ok(GpuInstance::from(model))
    }

    async fn update(&self, id: i32, changes: InstanceChanges) -> AppResult<GpuInstance> {
        let model = InstanceEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found("Instance")?;
        if changes.is_empty() {
            return Ok(GpuInstance::from(model));
        }

        let mut active: gpu_instance::ActiveModel = model.into();
        if let Some(nickname) = changes.nickname {
            active.nickname = Set(nickname);
        }
        if let Some(target_url) = changes.target_url {
            active.target_url = Set(target_url);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&self.db).await?;
        Ok(GpuInstance::from(model))
    }

    async fn delete_unassigned(&self, id: i32) -> AppResult<u64> {
        let result = InstanceEntity::delete_many()
            .filter(gpu_instance::Column::Id.eq(id))
            .filter(gpu_instance::Column::AssignedUserId.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

/// Statements shared with the transaction-scoped repository.
pub(crate) mod queries {
    use sea_orm::sea_query::Expr;
    use sea_orm::ConnectionTrait;

    use super::*;

    pub(crate) async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> AppResult<Option<GpuInstance>> {
        Ok(InstanceEntity::find_by_id(id).one(db).await?.map(GpuInstance::from))
    }

    /// Conditional claim: succeeds only while the row is unassigned.
    pub(crate) async fn claim<C: ConnectionTrait>(db: &C, id: i32, user_id: i32) -> AppResult<bool> {
        let result = InstanceEntity::update_many()
            .col_expr(gpu_instance::Column::AssignedUserId, Expr::value(user_id))
            .col_expr(gpu_instance::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(gpu_instance::Column::Id.eq(id))
            .filter(gpu_instance::Column::AssignedUserId.is_null())
            .exec(db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// Clear whatever assignment points at `user_id`; returns rows released.
    pub(crate) async fn release_for_user<C: ConnectionTrait>(db: &C, user_id: i32) -> AppResult<u64> {
        let result = InstanceEntity::update_many()
            .col_expr(
                gpu_instance::Column::AssignedUserId,
                Expr::value(Option::<i32>::None),
            )
            .col_expr(gpu_instance::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(gpu_instance::Column::AssignedUserId.eq(user_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

//! GPU instance registry entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::GpuInstance;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "gpu_instances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub instance_id: i64,
    #[sea_orm(unique)]
    pub instance_uuid: String,
    pub nickname: String,
    pub target_url: Option<String>,
    #[sea_orm(unique)]
    pub assigned_user_id: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for GpuInstance {
    fn from(model: Model) -> Self {
        GpuInstance {
            id: model.id,
            instance_id: model.instance_id,
            instance_uuid: model.instance_uuid,
            nickname: model.nickname,
            target_url: model.target_url,
            assigned_user_id: model.assigned_user_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

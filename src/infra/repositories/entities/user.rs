//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{User, UserState};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub hashed_password: String,
    #[sea_orm(unique)]
    pub email: Option<String>,
    #[sea_orm(unique)]
    pub phone: Option<String>,
    pub target_url: Option<String>,
    pub is_admin: bool,
    /// "active" or "inactive"
    pub state: String,
    pub owner_id: Option<i32>,
    pub instance_id: Option<i64>,
    pub instance_uuid: Option<String>,
    pub bearer_token: Option<String>,
    pub last_heartbeat: Option<DateTimeUtc>,
    pub last_login: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        User {
            id: model.id,
            username: model.username,
            email: model.email,
            phone: model.phone,
            hashed_password: model.hashed_password,
            target_url: model.target_url,
            is_admin: model.is_admin,
            owner_id: model.owner_id,
            state: UserState::from(model.state.as_str()),
            instance_id: model.instance_id,
            instance_uuid: model.instance_uuid,
            bearer_token: model.bearer_token,
            last_heartbeat: model.last_heartbeat,
            last_login: model.last_login,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

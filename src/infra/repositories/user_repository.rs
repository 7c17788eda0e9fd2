//! User repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DatabaseConnection, QueryOrder};

use super::entities::user::{self, Entity as UserEntity};
use crate::domain::{User, UserChanges};
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// Single-statement reads and writes; multi-row changes go through
/// [`crate::infra::UnitOfWork::transaction`].
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>>;

    /// Find user by login name
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Users created by `admin_id`, plus the admin itself
    async fn list_visible_to(&self, admin_id: i32) -> AppResult<Vec<User>>;

    /// Number of users created by `admin_id`
    async fn count_owned_by(&self, admin_id: i32) -> AppResult<u64>;

    /// Total number of accounts
    async fn count(&self) -> AppResult<u64>;

    /// Whether any administrator exists
    async fn has_admin(&self) -> AppResult<bool>;

    /// Active users with an instance and a recorded heartbeat
    async fn list_heartbeating(&self) -> AppResult<Vec<User>>;

    /// Every user with an assigned instance, regardless of state
    async fn list_with_instance(&self) -> AppResult<Vec<User>>;

    /// Apply column changes and return the updated user
    async fn apply(&self, id: i32, changes: UserChanges) -> AppResult<User>;
}

/// SeaORM-backed user repository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        queries::find_by_id(&self.db, id).await
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        queries::find_by(&self.db, user::Column::Username, username, None).await
    }

    async fn list_visible_to(&self, admin_id: i32) -> AppResult<Vec<User>> {
        use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter};

        let models = UserEntity::find()
            .filter(
                Condition::any()
                    .add(user::Column::OwnerId.eq(admin_id))
                    .add(user::Column::Id.eq(admin_id)),
            )
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(User::from).collect())
    }

    async fn count_owned_by(&self, admin_id: i32) -> AppResult<u64> {
        queries::count_owned_by(&self.db, admin_id).await
    }

    async fn count(&self) -> AppResult<u64> {
        use sea_orm::{EntityTrait, PaginatorTrait};

        Ok(UserEntity::find().count(&self.db).await?)
    }

    async fn has_admin(&self) -> AppResult<bool> {
        use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

        let admins = UserEntity::find()
            .filter(user::Column::IsAdmin.eq(true))
            .count(&self.db)
            .await?;
        Ok(admins > 0)
    }

    async fn list_heartbeating(&self) -> AppResult<Vec<User>> {
        use crate::config::STATE_ACTIVE;
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

        let models = UserEntity::find()
            .filter(user::Column::State.eq(STATE_ACTIVE))
            .filter(user::Column::InstanceId.is_not_null())
            .filter(user::Column::LastHeartbeat.is_not_null())
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(User::from).collect())
    }

    async fn list_with_instance(&self) -> AppResult<Vec<User>> {
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

        let models = UserEntity::find()
            .filter(user::Column::InstanceId.is_not_null())
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(User::from).collect())
    }

    async fn apply(&self, id: i32, changes: UserChanges) -> AppResult<User> {
        queries::apply(&self.db, id, changes).await
    }
}

/// Statements shared by [`UserStore`] and the transaction-scoped repository.
pub(crate) mod queries {
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
        QueryFilter, Set,
    };

    use super::*;
    use crate::domain::{NewUserRecord, UserState};
    use crate::errors::OptionExt;

    pub(crate) async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<Option<User>> {
        Ok(UserEntity::find_by_id(id).one(db).await?.map(User::from))
    }

    /// Look up by a unique text column, optionally ignoring one user.
    pub(crate) async fn find_by<C: ConnectionTrait>(
        db: &C,
        column: user::Column,
        value: &str,
        except_id: Option<i32>,
    ) -> AppResult<Option<User>> {
        let mut query = UserEntity::find().filter(column.eq(value));
        if let Some(id) = except_id {
            query = query.filter(user::Column::Id.ne(id));
        }
        Ok(query.one(db).await?.map(User::from))
    }

    pub(crate) async fn count_owned_by<C: ConnectionTrait>(db: &C, admin_id: i32) -> AppResult<u64> {
        Ok(UserEntity::find()
            .filter(user::Column::OwnerId.eq(admin_id))
            .count(db)
            .await?)
    }

    pub(crate) async fn insert<C: ConnectionTrait>(db: &C, record: NewUserRecord) -> AppResult<User> {
        let now = Utc::now();
        let (instance_id, instance_uuid) = match record.instance {
            Some(binding) => (Some(binding.instance_id), Some(binding.instance_uuid)),
            None => (None, None),
        };

        let active_model = user::ActiveModel {
            username: Set(record.username),
            hashed_password: Set(record.hashed_password),
            email: Set(record.email),
            phone: Set(record.phone),
            target_url: Set(record.target_url),
            is_admin: Set(record.is_admin),
            state: Set(UserState::Inactive.as_str().to_string()),
            owner_id: Set(record.owner_id),
            instance_id: Set(instance_id),
            instance_uuid: Set(instance_uuid),
            bearer_token: Set(record.bearer_token),
            last_heartbeat: Set(None),
            last_login: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active_model.insert(db).await?;
        Ok(User::from(model))
    }

    pub(crate) async fn apply<C: ConnectionTrait>(
        db: &C,
        id: i32,
        changes: UserChanges,
    ) -> AppResult<User> {
        let model = UserEntity::find_by_id(id).one(db).await?.ok_or_not_found("User")?;
        if changes.is_empty() {
            return Ok(User::from(model));
        }

        let mut active: user::ActiveModel = model.into();

        if let Some(username) = changes.username {
            active.username = Set(username);
        }
        if let Some(hash) = changes.hashed_password {
            active.hashed_password = Set(hash);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(phone) = changes.phone {
            active.phone = Set(phone);
        }
        if let Some(target_url) = changes.target_url {
            active.target_url = Set(target_url);
        }
        if let Some(is_admin) = changes.is_admin {
            active.is_admin = Set(is_admin);
        }
        if let Some(token) = changes.bearer_token {
            active.bearer_token = Set(token);
        }
        if let Some(state) = changes.state {
            active.state = Set(state.as_str().to_string());
        }
        if let Some(instance) = changes.instance {
            match instance {
                Some(binding) => {
                    active.instance_id = Set(Some(binding.instance_id));
                    active.instance_uuid = Set(Some(binding.instance_uuid));
                }
                None => {
                    active.instance_id = Set(None);
                    active.instance_uuid = Set(None);
                }
            }
        }
        if let Some(heartbeat) = changes.last_heartbeat {
            active.last_heartbeat = Set(heartbeat);
        }
        if let Some(login) = changes.last_login {
            active.last_login = Set(login);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(db).await?;
        Ok(User::from(model))
    }

    pub(crate) async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<()> {
        let result = UserEntity::delete_by_id(id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(crate::errors::AppError::not_found("User"));
        }
        Ok(())
    }
}

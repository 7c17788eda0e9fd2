//! User service - account management and instance assignment.
//!
//! Every operation is performed on behalf of an administrator (`actor_id`).
//! Writes that touch both a user row and a registry row run in one transaction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::domain::{GpuInstance, NewUser, NewUserRecord, Password, User, UserChanges, UserPatch, UserState};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{TransactionContext, UnitOfWork};
use crate::with_transaction;

const INSTANCE_TAKEN: &str = "Instance is already assigned to another user";

/// Owned-user count against the per-admin cap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserCount {
    #[schema(example = 3)]
    pub count: u64,
    #[schema(example = 15)]
    pub max: u64,
}

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// The actor plus the users it created
    async fn list_users(&self, actor_id: i32) -> AppResult<Vec<User>>;

    /// Users created by the actor, and the cap
    async fn count_users(&self, actor_id: i32) -> AppResult<UserCount>;

    /// One user the actor manages
    async fn get_user(&self, actor_id: i32, id: i32) -> AppResult<User>;

    /// Create an account owned by the actor, optionally claiming an instance
    async fn create_user(&self, actor_id: i32, input: NewUser) -> AppResult<User>;

    /// Apply a partial update; may reassign or release the instance
    async fn update_user(&self, actor_id: i32, id: i32, patch: UserPatch) -> AppResult<User>;

    /// Delete an owned account and release its instance
    async fn delete_user(&self, actor_id: i32, id: i32) -> AppResult<()>;

    /// Total number of accounts
    async fn total_users(&self) -> AppResult<u64>;
}

/// Concrete implementation of UserService using Unit of Work.
pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
    max_users_per_admin: u64,
}

impl<U: UnitOfWork> UserManager<U> {
    pub fn new(uow: Arc<U>, max_users_per_admin: u64) -> Self {
        Self {
            uow,
            max_users_per_admin,
        }
    }
}

/// Reject values already held by a different account.
async fn ensure_unique(
    ctx: &TransactionContext<'_>,
    username: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
    except_id: Option<i32>,
) -> AppResult<()> {
    let users = ctx.users();
    if let Some(username) = username {
        if users.find_by_username(username, except_id).await?.is_some() {
            return Err(AppError::conflict("Username already exists"));
        }
    }
    if let Some(email) = email {
        if users.find_by_email(email, except_id).await?.is_some() {
            return Err(AppError::conflict("Email already exists"));
        }
    }
    if let Some(phone) = phone {
        if users.find_by_phone(phone, except_id).await?.is_some() {
            return Err(AppError::conflict("Phone already exists"));
        }
    }
    Ok(())
}

/// Registry row that can be handed to `user_id`.
async fn claimable(ctx: &TransactionContext<'_>, instance_pk: i32, user_id: Option<i32>) -> AppResult<GpuInstance> {
    let instance = ctx
        .instances()
        .find_by_id(instance_pk)
        .await?
        .ok_or_not_found("Instance")?;
    match instance.assigned_user_id {
        Some(holder) if Some(holder) != user_id => Err(AppError::conflict(INSTANCE_TAKEN)),
        _ => Ok(instance),
    }
}

fn hash_optional(password: Option<&str>) -> AppResult<Option<String>> {
    password
        .map(|p| Password::new(p).map(Password::into_string))
        .transpose()
}

#[async_trait]
impl<U: UnitOfWork> UserService for UserManager<U> {
    async fn list_users(&self, actor_id: i32) -> AppResult<Vec<User>> {
        self.uow.users().list_visible_to(actor_id).await
    }

    async fn count_users(&self, actor_id: i32) -> AppResult<UserCount> {
        let count = self.uow.users().count_owned_by(actor_id).await?;
        Ok(UserCount {
            count,
            max: self.max_users_per_admin,
        })
    }

    async fn get_user(&self, actor_id: i32, id: i32) -> AppResult<User> {
        let user = self
            .uow
            .users()
            .find_by_id(id)
            .await?
            .ok_or_not_found("User")?;
        if !user.is_managed_by(actor_id) {
            return Err(AppError::forbidden("You can only view users you created"));
        }
        Ok(user)
    }

    async fn create_user(&self, actor_id: i32, input: NewUser) -> AppResult<User> {
        let hashed_password = Password::new(&input.password)?.into_string();
        let cap = self.max_users_per_admin;

        // Cap check and insert must not interleave with another create
        let user = with_transaction!(serializable self.uow, |ctx| {
            let owned = ctx.users().count_owned_by(actor_id).await?;
            if owned >= cap {
                return Err(AppError::bad_request(format!(
                    "User limit reached: an administrator can create at most {cap} users"
                )));
            }

            ensure_unique(
                &ctx,
                Some(&input.username),
                input.email.as_deref(),
                input.phone.as_deref(),
                None,
            )
            .await?;

            let instance = match input.gpu_instance_id {
                Some(instance_pk) => Some(claimable(&ctx, instance_pk, None).await?),
                None => None,
            };

            let target_url = input
                .target_url
                .or_else(|| instance.as_ref().and_then(|i| i.target_url.clone()));

            let user = ctx
                .users()
                .insert(NewUserRecord {
                    username: input.username,
                    hashed_password,
                    email: input.email,
                    phone: input.phone,
                    target_url,
                    is_admin: input.is_admin,
                    owner_id: Some(actor_id),
                    instance: instance.as_ref().map(GpuInstance::binding),
                    bearer_token: input.bearer_token,
                })
                .await?;

            if let Some(instance) = &instance {
                if !ctx.instances().claim(instance.id, user.id).await? {
                    return Err(AppError::conflict(INSTANCE_TAKEN));
                }
            }

            Ok(user)
        })?;

        tracing::info!(
            user_id = user.id,
            owner_id = actor_id,
            instance_id = ?user.instance_id,
            "User created"
        );
        Ok(user)
    }

    async fn update_user(&self, actor_id: i32, id: i32, patch: UserPatch) -> AppResult<User> {
        let hashed_password = hash_optional(patch.password.as_deref())?;

        let user = with_transaction!(self.uow, |ctx| {
            let current = ctx.users().find_by_id(id).await?.ok_or_not_found("User")?;
            if !current.is_managed_by(actor_id) {
                return Err(AppError::forbidden("You can only update users you created"));
            }
            if id == actor_id && patch.is_admin == Some(false) {
                return Err(AppError::bad_request("You cannot remove your own admin rights"));
            }

            ensure_unique(
                &ctx,
                patch.username.as_deref(),
                patch.email.as_ref().and_then(|e| e.as_deref()),
                patch.phone.as_ref().and_then(|p| p.as_deref()),
                Some(id),
            )
            .await?;

            let mut changes = UserChanges {
                username: patch.username,
                hashed_password,
                email: patch.email,
                phone: patch.phone,
                target_url: patch.target_url,
                is_admin: patch.is_admin,
                bearer_token: patch.bearer_token,
                state: patch.state,
                ..Default::default()
            };

            match patch.gpu_instance_id {
                None => {}
                Some(None) => {
                    if current.has_instance() {
                        ctx.instances().release_for_user(id).await?;
                        changes.instance = Some(None);
                        changes.state = Some(UserState::Inactive);
                        changes.last_heartbeat = Some(None);
                    }
                }
                Some(Some(instance_pk)) => {
                    let instance = claimable(&ctx, instance_pk, Some(id)).await?;
                    if instance.assigned_user_id != Some(id) {
                        ctx.instances().release_for_user(id).await?;
                        if !ctx.instances().claim(instance.id, id).await? {
                            return Err(AppError::conflict(INSTANCE_TAKEN));
                        }
                        changes.instance = Some(Some(instance.binding()));
                        changes.state = Some(UserState::Inactive);
                        changes.last_heartbeat = Some(None);
                        if changes.target_url.is_none() && instance.target_url.is_some() {
                            changes.target_url = Some(instance.target_url.clone());
                        }
                    }
                }
            }

            ctx.users().apply(id, changes).await
        })?;

        tracing::info!(user_id = id, actor_id, "User updated");
        Ok(user)
    }

    async fn delete_user(&self, actor_id: i32, id: i32) -> AppResult<()> {
        if id == actor_id {
            return Err(AppError::bad_request("Cannot delete yourself"));
        }

        with_transaction!(self.uow, |ctx| {
            let user = ctx.users().find_by_id(id).await?.ok_or_not_found("User")?;
            if user.owner_id != Some(actor_id) {
                return Err(AppError::forbidden("You can only delete users you created"));
            }
            if user.is_admin && ctx.users().count_owned_by(id).await? > 0 {
                return Err(AppError::bad_request(
                    "Cannot delete an administrator who still owns users",
                ));
            }

            ctx.instances().release_for_user(id).await?;
            ctx.users().delete(id).await
        })?;

        tracing::info!(user_id = id, actor_id, "User deleted");
        Ok(())
    }

    async fn total_users(&self) -> AppResult<u64> {
        self.uow.users().count().await
    }
}

//! First-run account setup: the seed administrator and an optional demo user.

use crate::config::{Config, DEMO_USERNAME};
use crate::domain::{NewUser, NewUserRecord, Password, User};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::with_transaction;

use super::UserService;

/// Create the seed administrator when no administrator exists yet.
///
/// Returns the new account, or `None` when nothing was created. A missing
/// `SEED_ADMIN_PASSWORD` is logged, not fatal.
pub async fn ensure_admin<U: UnitOfWork>(uow: &U, config: &Config) -> AppResult<Option<User>> {
    if uow.users().has_admin().await? {
        tracing::debug!("Administrator present, skipping bootstrap");
        return Ok(None);
    }

    let Some(password) = config.seed_admin_password() else {
        tracing::warn!("No administrator exists and SEED_ADMIN_PASSWORD is not set");
        return Ok(None);
    };

    let hashed_password = Password::new(password)?.into_string();
    let username = config.seed_admin_username.clone();

    let admin = with_transaction!(uow, |ctx| {
        if ctx.users().find_by_username(&username, None).await?.is_some() {
            return Err(AppError::conflict(format!(
                "User '{username}' exists but is not an administrator"
            )));
        }
        ctx.users()
            .insert(NewUserRecord {
                username,
                hashed_password,
                email: None,
                phone: None,
                target_url: None,
                is_admin: true,
                owner_id: None,
                instance: None,
                bearer_token: None,
            })
            .await
    })?;

    tracing::info!(user_id = admin.id, username = %admin.username, "Seed administrator created");
    Ok(Some(admin))
}

/// Create the `demo` account under the seed administrator, unless it exists.
pub async fn seed_demo_user<U: UnitOfWork>(
    uow: &U,
    users: &dyn UserService,
    config: &Config,
    password: &str,
    gpu_instance_id: Option<i32>,
) -> AppResult<Option<User>> {
    let repo = uow.users();
    if repo.find_by_username(DEMO_USERNAME).await?.is_some() {
        tracing::info!("Demo user already exists");
        return Ok(None);
    }

    let admin = repo
        .find_by_username(&config.seed_admin_username)
        .await?
        .filter(|u| u.is_admin)
        .ok_or_else(|| {
            AppError::bad_request(format!(
                "Seed administrator '{}' not found",
                config.seed_admin_username
            ))
        })?;

    let demo = users
        .create_user(
            admin.id,
            NewUser {
                username: DEMO_USERNAME.to_string(),
                password: password.to_string(),
                gpu_instance_id,
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(user_id = demo.id, owner_id = admin.id, "Demo user created");
    Ok(Some(demo))
}

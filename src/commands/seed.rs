//! Seed command - First-run accounts without starting the server.

use std::sync::Arc;

use crate::cli::args::SeedArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{Database, Persistence};
use crate::services::{ensure_admin, seed_demo_user, UserManager};

/// Execute the seed command
pub async fn execute(args: SeedArgs, config: Config) -> AppResult<()> {
    let db = Database::connect(&config).await?;
    let uow = Arc::new(Persistence::new(db.get_connection()));

    match ensure_admin(uow.as_ref(), &config).await? {
        Some(admin) => println!("Created administrator '{}'", admin.username),
        None => println!("Administrator bootstrap skipped"),
    }

    if args.demo {
        let password = args
            .demo_password
            .ok_or_else(|| AppError::validation("--demo-password or DEMO_PASSWORD is required"))?;
        let users = UserManager::new(uow.clone(), config.max_users_per_admin);
        match seed_demo_user(uow.as_ref(), &users, &config, &password, args.demo_instance).await? {
            Some(demo) => println!("Created demo user '{}' (id {})", demo.username, demo.id),
            None => println!("Demo user already exists"),
        }
    }

    Ok(())
}

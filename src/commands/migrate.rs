//! Migrate command - schema management without starting the server.

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    match args.action {
        MigrateAction::Up => db.run_migrations().await?,
        MigrateAction::Down => db.rollback_migration().await?,
        MigrateAction::Fresh => {
            tracing::warn!("Dropping every table, including users and the instance registry");
            db.fresh_migrations().await?
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            let pending = status.iter().filter(|(_, applied)| !applied).count();
            for (name, applied) in &status {
                println!("{:<8} {}", if *applied { "applied" } else { "pending" }, name);
            }
            println!("{} migration(s), {} pending", status.len(), pending);
            return Ok(());
        }
    }

    tracing::info!(action = ?args.action, "Migration command completed");
    Ok(())
}

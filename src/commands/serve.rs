//! Serve command - Starts the HTTP server and the lifecycle jobs.

use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{Database, GpuVendorClient, InstanceLocks, Persistence, UnitOfWork, VendorApi};
use crate::jobs::{JobSettings, JobSupervisor, Reconciler};
use crate::services::ensure_admin;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> AppResult<()> {
    tracing::info!("Starting server...");

    let db = Arc::new(Database::connect(&config).await?);

    let uow = Persistence::new(db.get_connection());
    ensure_admin(&uow, &config).await?;

    let vendor: Arc<dyn VendorApi> = Arc::new(GpuVendorClient::from_config(&config)?);
    if config.vendor_bearer_token().is_none() {
        tracing::warn!("VENDOR_BEARER_TOKEN not set; users without their own token cannot start instances");
    }

    // Portal actions and background stops serialize on the same locks
    let locks = InstanceLocks::new();

    let jobs = if args.no_jobs {
        tracing::info!("Lifecycle jobs disabled");
        None
    } else {
        let reconciler = Arc::new(Reconciler::from_config(
            uow.users(),
            vendor.clone(),
            locks.clone(),
            &config,
        ));
        Some(JobSupervisor::start(reconciler, JobSettings::from_config(&config)?))
    };

    let addr = format!(
        "{}:{}",
        args.host.as_deref().unwrap_or(&config.server_host),
        args.port.unwrap_or(config.server_port)
    );
    let cors_origins = config.cors_origins.clone();
    let app_state = AppState::from_config(db, config, vendor, locks);
    let app = create_router(app_state, &cors_origins);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)));

    if let Some(jobs) = jobs {
        jobs.shutdown().await;
    }
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

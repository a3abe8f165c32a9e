//! TreeVault Server: multi-tenant file-storage core.
//!
//! Main entry point that wires all crates together and runs the scheduled
//! tasks until interrupted.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use treevault_core::config::{AppConfig, DatabaseBackend};
use treevault_core::error::AppError;
use treevault_core::traits::{ObjectStore, QuotaLedger};
use treevault_database::migration::run_migrations;
use treevault_database::repositories::QuotaRepository;
use treevault_database::store::{MemoryQuotaLedger, MemoryStore, PgStore, ShareStore, TreeStore};
use treevault_database::DatabasePool;
use treevault_service::Services;
use treevault_storage::{LocalObjectStore, StorageJanitor};
use treevault_worker::{CronScheduler, TrashPurgeJob};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("TREEVAULT_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Store handles for the configured backend.
struct Backend {
    tree: Arc<dyn TreeStore>,
    shares: Arc<dyn ShareStore>,
    quota: Arc<dyn QuotaLedger>,
    pool: Option<DatabasePool>,
}

async fn connect_backend(config: &AppConfig) -> Result<Backend, AppError> {
    match config.database.backend {
        DatabaseBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let db = DatabasePool::connect(&config.database).await?;

            tracing::info!("Running database migrations...");
            run_migrations(db.pool()).await?;

            let store = Arc::new(PgStore::new(db.pool().clone()));
            Ok(Backend {
                tree: Arc::clone(&store) as Arc<dyn TreeStore>,
                shares: store,
                quota: Arc::new(QuotaRepository::new(db.pool().clone())),
                pool: Some(db),
            })
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            let store = Arc::new(MemoryStore::new());
            Ok(Backend {
                tree: Arc::clone(&store) as Arc<dyn TreeStore>,
                shares: store,
                quota: Arc::new(MemoryQuotaLedger::new()),
                pool: None,
            })
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting TreeVault v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Stores ───────────────────────────────────────────
    let backend = connect_backend(&config).await?;

    // ── Step 2: Object storage + janitor ─────────────────────────
    let objects: Arc<dyn ObjectStore> =
        Arc::new(LocalObjectStore::new(&config.storage.root_path).await?);
    if !objects.health_check().await? {
        tracing::warn!(root = %config.storage.root_path, "Object storage root is unavailable");
    }
    let (janitor, janitor_handle) = StorageJanitor::spawn(objects, &config.storage);

    // ── Step 3: Services ─────────────────────────────────────────
    let services = Services::new(
        backend.tree,
        backend.shares,
        backend.quota,
        janitor.clone(),
        &config.trash,
    );
    tracing::info!(
        retention_days = services.trash.retention_days(),
        "Services initialized"
    );

    // ── Step 4: Scheduled tasks ──────────────────────────────────
    let mut scheduler = if config.worker.enabled {
        let scheduler = CronScheduler::new(TrashPurgeJob::new(services.trash.clone())).await?;
        scheduler.register_default_tasks(&config.trash).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Scheduled tasks disabled");
        None
    };

    // ── Step 5: Wait for shutdown ────────────────────────────────
    tracing::info!("TreeVault is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for shutdown signal: {e}")))?;
    tracing::info!("Shutdown signal received");

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }

    // Let queued object deletions finish before exiting.
    janitor.flush().await;
    janitor_handle.abort();

    if let Some(pool) = backend.pool {
        pool.close().await;
    }

    tracing::info!("TreeVault stopped");
    Ok(())
}

//! Testorch Coordinator - Main Entry Point
//!
//! Composition root: wires PS (SQLite), CS (Redis, or an in-memory
//! fallback), SS, SC (with the reaper sweep), DI, and the RPC server.

mod telemetry;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use testorch_api_rpc::{server::RpcServerConfig, RpcServer};
use testorch_core::application::{
    shutdown_channel, DispatchService, MaintenanceScheduler, SchedulerConfig, SchedulerLoop,
    SubmissionService,
};
use testorch_core::port::id_provider::UuidProvider;
use testorch_core::port::time_provider::SystemTimeProvider;
use testorch_core::port::{CoordinationStore, MaintenanceConfig};
use testorch_infra_coordination::{InMemoryCoordinationStore, RedisCoordinationStore};
use testorch_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository, SqliteMaintenance};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_DB_PATH: &str = "~/.testorch/meta.db";

#[tokio::main]
async fn main() -> Result<()> {
    let log_format = std::env::var("TESTORCH_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("testorch=info"))
        .expect("failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Testorch coordinator v{} starting...", VERSION);

    if let Err(e) = telemetry::init_telemetry() {
        tracing::warn!(error = ?e, "failed to initialize OpenTelemetry (continuing without it)");
    }

    // Configuration (section 4.6: env vars read once, sane dev defaults).
    let db_path = std::env::var("TESTORCH_DB_PATH")
        .unwrap_or_else(|_| shellexpand::tilde(DEFAULT_DB_PATH).into_owned());
    let rpc_port: u16 = std::env::var("TESTORCH_RPC_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9527);
    let redis_addr = std::env::var("TESTORCH_REDIS_ADDR").ok();

    info!(db_path = %db_path, "initializing persistent store...");
    let pool = create_pool(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {e}"))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("migration failed: {e}"))?;

    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let job_repo = Arc::new(SqliteJobRepository::new(pool.clone()));
    let maintenance = Arc::new(SqliteMaintenance::new(pool.clone()));

    let coordination: Arc<dyn CoordinationStore> = match redis_addr {
        Some(addr) => {
            info!(redis_addr = %addr, "connecting to coordination store...");
            Arc::new(
                RedisCoordinationStore::connect(&addr)
                    .await
                    .map_err(|e| anyhow::anyhow!("redis connection failed: {e}"))?,
            )
        }
        None => {
            tracing::warn!(
                "TESTORCH_REDIS_ADDR not set, falling back to an in-process coordination store \
                 (leases/idempotency/heartbeats will not be shared across replicas)"
            );
            Arc::new(InMemoryCoordinationStore::default())
        }
    };

    let submission = Arc::new(SubmissionService::new(
        job_repo.clone(),
        coordination.clone(),
        id_provider.clone(),
        time_provider.clone(),
    ));
    let dispatch = Arc::new(DispatchService::new(
        job_repo.clone(),
        coordination.clone(),
        id_provider.clone(),
        time_provider.clone(),
    ));

    info!("starting JSON-RPC server...");
    let rpc_config = RpcServerConfig {
        port: rpc_port,
        ..Default::default()
    };
    let rpc_server = RpcServer::new(rpc_config, submission, dispatch);
    let rpc_handle = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {e}"))?;

    info!("starting scheduler loop...");
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let scheduler = Arc::new(SchedulerLoop::new(
        job_repo,
        coordination,
        id_provider,
        time_provider,
        SchedulerConfig::default(),
    ));
    let scheduler_handle = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run(shutdown_rx).await }
    });

    info!("starting maintenance scheduler...");
    let maintenance_config = MaintenanceConfig::default();
    let maintenance_scheduler = MaintenanceScheduler::new(maintenance, maintenance_config, 24);
    tokio::spawn(async move {
        maintenance_scheduler.run().await;
    });

    info!("system ready, waiting for tasks. Press Ctrl+C to shut down.");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, exiting gracefully...");

    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {e}"))?;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), scheduler_handle).await;

    info!("shutdown complete.");

    Ok(())
}

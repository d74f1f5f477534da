//! linkrelay server - Main Entry Point
//!
//! Wires settings, the queue backend and the HTTP surface, then serves until
//! Ctrl+C.

mod settings;
mod telemetry;

use anyhow::{Context, Result};
use settings::{Backend, Settings};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use linkrelay_api_http::{HttpServer, HttpServerConfig};
use linkrelay_core::application::{
    shutdown_channel, DeliveryService, MaintenanceScheduler, QueueStore,
};
use linkrelay_core::port::sorted_set::memory::InMemorySortedSetStore;
use linkrelay_core::port::time_provider::SystemTimeProvider;
use linkrelay_core::port::{Maintenance, SortedSetStore, TimeProvider};
use linkrelay_infra_sqlite::{create_pool, run_migrations, SqliteMaintenance, SqliteSortedSetStore};
use linkrelay_infra_upstash::{UpstashConfig, UpstashSortedSetStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Console logging, plus daily-rolled JSON files when `LINKRELAY_LOG_DIR` is set.
/// The returned guard flushes the file writer on drop.
fn init_logging() -> Result<Option<WorkerGuard>> {
    let log_format =
        std::env::var("LINKRELAY_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("linkrelay=info,tower_http=info"))
        .context("Failed to create env filter")?;

    let (file_writer, guard) = match std::env::var("LINKRELAY_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            let dir = shellexpand::tilde(dir.trim()).into_owned();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log dir {}", dir))?;
            let appender = tracing_appender::rolling::daily(&dir, "linkrelay-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        _ => (None, None),
    };
    let file_layer =
        file_writer.map(|writer| fmt::layer().json().with_ansi(false).with_writer(writer));

    let (otel, status) = telemetry::layer()?;
    let registry = tracing_subscriber::registry()
        .with(otel)
        .with(env_filter)
        .with(file_layer);

    match log_format.as_str() {
        // Production: JSON structured logging
        "json" => registry.with(fmt::layer().json()).init(),
        // Development: pretty formatting with colors
        _ => registry.with(fmt::layer().pretty()).init(),
    }

    status.log();
    Ok(guard)
}

/// Queue backend plus its sweeper, when the backend cannot expire keys itself
async fn open_backend(
    settings: &Settings,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<(Arc<dyn SortedSetStore>, Option<Arc<dyn Maintenance>>)> {
    let upstash = UpstashConfig::from_env();

    match settings.backend(upstash.is_some())? {
        Backend::Sqlite => {
            if let Some(dir) = settings.db_dir() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            let url = settings.database_url();
            info!(url = %url, "Using SQLite backend");

            let pool = create_pool(&url).await.context("DB pool creation failed")?;
            run_migrations(&pool).await.context("Migration failed")?;

            let store: Arc<dyn SortedSetStore> =
                Arc::new(SqliteSortedSetStore::new(pool.clone(), time_provider.clone()));
            let maintenance: Arc<dyn Maintenance> =
                Arc::new(SqliteMaintenance::new(pool, time_provider));
            Ok((store, Some(maintenance)))
        }
        Backend::Upstash => {
            let config = upstash.context(
                "Upstash backend selected but UPSTASH_REDIS_REST_URL/TOKEN (or KV_REST_API_URL/TOKEN) are not set",
            )?;
            info!(url = %config.url, "Using Upstash backend");
            let store: Arc<dyn SortedSetStore> = Arc::new(UpstashSortedSetStore::new(config)?);
            Ok((store, None))
        }
        Backend::Memory => {
            info!("Using in-memory backend (queues are lost on restart)");
            let store = Arc::new(InMemorySortedSetStore::new(time_provider));
            let maintenance: Arc<dyn Maintenance> = store.clone();
            let sets: Arc<dyn SortedSetStore> = store;
            Ok((sets, Some(maintenance)))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    let _log_guard = init_logging()?;
    info!("linkrelay server v{} starting...", VERSION);

    // 2. Settings
    let settings = Settings::load()?;
    let token_format = settings.token_format()?;
    let queue_settings = settings.queue_settings()?;
    info!(
        max_queue_size = queue_settings.max_queue_size,
        max_deliver_per_poll = queue_settings.max_deliver_per_poll,
        item_ttl_seconds = queue_settings.item_ttl_seconds,
        "Queue settings loaded"
    );

    // 3. Backend
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let (sets, maintenance) = open_backend(&settings, time_provider.clone()).await?;

    // 4. Services (DI wiring)
    let queue = Arc::new(QueueStore::new(sets, time_provider, queue_settings));
    let delivery = Arc::new(DeliveryService::new(
        queue,
        token_format,
        settings.public_base_url.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    // 5. Maintenance, for backends without native expiry
    let maintenance_handle = maintenance.map(|maintenance| {
        let scheduler = MaintenanceScheduler::new(maintenance, settings.maintenance_interval());
        tokio::spawn(scheduler.run(shutdown_rx.clone()))
    });

    // 6. HTTP server
    let http_config = HttpServerConfig {
        host: settings.host.clone(),
        port: settings.port,
    };
    let server = HttpServer::bind(&http_config, delivery).await?;
    info!(
        addr = %server.local_addr()?,
        public_base_url = %settings.public_base_url,
        "System ready"
    );
    let server_handle = tokio::spawn(server.run(shutdown_rx));

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");
    shutdown_tx.shutdown();

    match tokio::time::timeout(SHUTDOWN_GRACE, server_handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!(error = %e, "HTTP server failed"),
        Ok(Err(e)) => error!(error = %e, "HTTP server task panicked"),
        Err(_) => error!("HTTP server did not stop within the grace period"),
    }
    if let Some(handle) = maintenance_handle {
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, handle).await;
    }

    info!("Shutdown complete.");
    Ok(())
}

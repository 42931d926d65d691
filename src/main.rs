//! SimGuardian notifier: keeps the notification store bound to the
//! configured session and logs store events.
//!
//! Main entry point that wires all crates together and runs until shutdown.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing_subscriber::{EnvFilter, fmt};

use simguardian_core::config::{AppConfig, SourceProvider};
use simguardian_core::error::AppError;
use simguardian_core::types::id::UserId;
use simguardian_database::DatabasePool;
use simguardian_realtime::notification::StoreEvent;
use simguardian_realtime::source::{MemoryEventSource, PgEventSource};
use simguardian_realtime::{EventSource, NotificationStore, SessionBinding, SessionGate};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Notifier error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("SIMGUARDIAN_ENV").unwrap_or_else(|_| "development".to_string());
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

/// Main notifier run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SimGuardian notifier v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Event source ─────────────────────────────────────
    let store_config = &config.realtime.notifications;
    let (source, db_pool): (Arc<dyn EventSource>, Option<DatabasePool>) =
        match config.source.provider {
            SourceProvider::Postgres => {
                let db_config = config.database.as_ref().ok_or_else(|| {
                    AppError::configuration("Postgres source requires a [database] section")
                })?;
                tracing::info!("Connecting to database...");
                let pool = DatabasePool::connect(db_config).await?;
                let source: Arc<dyn EventSource> =
                    Arc::new(PgEventSource::new(pool.pool().clone(), store_config));
                (source, Some(pool))
            }
            SourceProvider::Memory => {
                tracing::info!("Using in-memory notification source");
                let source: Arc<dyn EventSource> =
                    Arc::new(MemoryEventSource::new(store_config.event_buffer));
                (source, None)
            }
        };

    // ── Step 2: Store + session binding ──────────────────────────
    let (store, store_task) = NotificationStore::spawn(source, store_config);
    let events_task = tokio::spawn(log_store_events(store.subscribe_events()));

    let gate = SessionGate::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let binding_task = SessionBinding::new(gate.clone(), store.clone()).spawn(shutdown_rx);

    // ── Step 3: Initial identity ─────────────────────────────────
    match config.session.identity.as_deref() {
        Some(raw) => {
            let owner: UserId = raw.parse().map_err(|e| {
                AppError::configuration(format!("Invalid session.identity '{}': {}", raw, e))
            })?;
            gate.sign_in(owner);
        }
        None => tracing::info!("No session identity configured, store stays signed out"),
    }

    // ── Step 4: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    gate.sign_out();
    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(std::time::Duration::from_secs(10), binding_task).await;

    store.shutdown().await?;
    let _ = store_task.await;
    events_task.abort();

    if let Some(pool) = db_pool {
        pool.close().await;
    }

    tracing::info!("SimGuardian notifier shut down gracefully");
    Ok(())
}

/// Log every store event until the store stops
async fn log_store_events(mut events: broadcast::Receiver<StoreEvent>) {
    loop {
        match events.recv().await {
            Ok(StoreEvent::Arrived { notification, toast }) => {
                tracing::info!(
                    notification_id = %notification.id,
                    category = %notification.category,
                    variant = ?toast.variant,
                    title = %toast.title,
                    "Notification arrived"
                );
            }
            Ok(StoreEvent::Persisted { ids }) => {
                tracing::debug!(count = ids.len(), "Read state saved");
            }
            Ok(StoreEvent::PersistFailed { ids, error }) => {
                tracing::warn!(count = ids.len(), error = %error, "Read state not saved");
            }
            Ok(StoreEvent::SubscriptionIdle { owner, generation }) => {
                tracing::warn!(owner = %owner, generation, "Live notifications paused");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event logger lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! # plughubd — plughub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and install logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Seed the device list, pick the device controller
//! - Prime the state cache; an unreachable controller at boot is fatal
//! - Start the cache refresher and the rule ticker
//! - Build the axum router and serve until SIGINT/SIGTERM
//! - Drain the server, then stop and join the background tasks
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;
mod remote;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use plughub_adapter_http_axum::state::AppState;
use plughub_adapter_storage_sqlite_sqlx::SqliteConfigStore;
use plughub_adapter_virtual::VirtualController;
use plughub_app::ports::ConfigStore;
use plughub_app::rule_scheduler::RuleScheduler;
use plughub_app::services::GatewayService;
use plughub_app::state_cache::StateCache;

use crate::config::{Config, RemoteMode};
use crate::remote::Remote;

/// Failures that abort startup.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("initial state refresh failed: {0}")]
    InitialRefresh(String),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging.filter);

    // Database
    let db = plughub_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let store = Arc::new(SqliteConfigStore::new(db.pool().clone()));
    seed_devices(&config, &store).await?;

    // Core
    let remote = Remote::from_config(&config)?;
    let cache = Arc::new(StateCache::new(remote, config.cache_config()));
    let status = cache.refresh().await;
    if !status.ok {
        return Err(StartupError::InitialRefresh(status.message).into());
    }
    let scheduler = Arc::new(
        RuleScheduler::load(Arc::clone(&store), Arc::clone(&cache), config.scheduler_config())
            .await?,
    );

    let refresher = cache.spawn_refresher();
    let ticker = scheduler.spawn_ticker();

    // HTTP
    let gateway = Arc::new(GatewayService::new(store, cache, scheduler));
    let mut state = AppState::new(gateway);
    if let Some(api_key) = &config.auth.api_key {
        state = state.with_api_key(api_key.as_str());
    } else {
        tracing::warn!("no API key configured, the API is open");
    }
    let app = plughub_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "plughubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in [ticker, refresher] {
        let name = task.name();
        task.shutdown().await;
        tracing::debug!(task = name, "background task joined");
    }
    tracing::info!("plughubd stopped");

    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?} ({err}), falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Replace the stored device list with the configured one, if any. In
/// virtual mode an empty store is seeded with the simulated devices.
async fn seed_devices(
    config: &Config,
    store: &SqliteConfigStore,
) -> Result<(), plughub_domain::error::PlugHubError> {
    let configured = config.seed_devices();
    if !configured.is_empty() {
        tracing::info!(devices = configured.len(), "seeding devices from configuration");
        return store.set_devices(configured).await;
    }
    if config.remote.mode == RemoteMode::Virtual && store.get_devices().await?.is_empty() {
        let devices = VirtualController::default().devices().to_vec();
        tracing::info!(devices = devices.len(), "seeding virtual devices");
        return store.set_devices(devices).await;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

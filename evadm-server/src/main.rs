//! evadm-server - event administration service
//!
//! Serves the scan endpoints used at the check-in and gift desks and the
//! catalog endpoints used by the admin dashboard.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use evadm_common::api::load_shared_secret;
use evadm_common::config::{ConfigOverrides, ServiceConfig, StoreBackend};
use evadm_common::db::{init_database, DocumentStore, MemoryDocumentStore, SqliteDocumentStore};
use evadm_common::time::SystemClock;
use evadm_server::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for evadm-server
#[derive(Parser, Debug)]
#[command(name = "evadm-server")]
#[command(about = "Event administration service: check-in, gift redemption and catalogs")]
#[command(version)]
struct Args {
    /// TOML config file (default: platform config dir, then /etc/evadm)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:5780
    #[arg(short, long, env = "EVADM_BIND_ADDR")]
    bind: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "EVADM_DATABASE")]
    database: Option<PathBuf>,

    /// Document store backend: sqlite or memory
    #[arg(long, env = "EVADM_STORE")]
    store: Option<StoreBackend>,

    /// API shared secret; 0 disables authentication
    #[arg(long, env = "EVADM_SHARED_SECRET")]
    shared_secret: Option<i64>,

    /// Default tracing filter when RUST_LOG is unset
    #[arg(long, env = "EVADM_LOG_LEVEL")]
    log_level: Option<String>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        ConfigOverrides {
            config_file: args.config,
            bind_addr: args.bind,
            database_path: args.database,
            store: args.store,
            shared_secret: args.shared_secret,
            log_level: args.log_level,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise start at info and switch to the configured level below
    let env_filter = EnvFilter::try_from_default_env().ok();
    let has_env_filter = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting evadm-server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::resolve(args.into()).context("Failed to resolve configuration")?;

    if !has_env_filter {
        let level = EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("Invalid log_level '{}'", config.log_level))?;
        filter_handle
            .modify(|f| *f = level)
            .context("Failed to apply log level")?;
    }

    info!("Store backend: {:?}", config.store);

    let (store, stored_secret): (Arc<dyn DocumentStore>, Option<i64>) = match config.store {
        StoreBackend::Sqlite => {
            info!("Database path: {}", config.database_path.display());
            let pool = init_database(&config.database_path)
                .await
                .context("Failed to initialize database")?;

            let secret = match config.shared_secret {
                Some(_) => None,
                None => Some(
                    load_shared_secret(&pool)
                        .await
                        .context("Failed to load shared secret")?,
                ),
            };
            (Arc::new(SqliteDocumentStore::new(pool)) as Arc<dyn DocumentStore>, secret)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; all data is lost on shutdown");
            (Arc::new(MemoryDocumentStore::new()) as Arc<dyn DocumentStore>, None)
        }
    };

    let shared_secret = config.shared_secret.or(stored_secret).unwrap_or(0);
    if shared_secret == 0 {
        warn!("API authentication disabled (shared_secret = 0)");
    } else {
        info!("API authentication enabled");
    }

    let state = AppState::new(store, Arc::new(SystemClock), &config, shared_secret);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("evadm-server listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

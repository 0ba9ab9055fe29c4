//! ssf-admin - Shelter severity framework administration service
//!
//! Serves the framework CRUD, CSV import/export and tree editor endpoints
//! over a local SQLite database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ssf_common::config::{CliOverrides, ServiceConfig, TomlConfig, ROOT_FOLDER_ENV};
use ssf_common::db::init_database;
use ssf_admin::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "ssf_admin=info,ssf_common=info,tower_http=info";

/// Command-line arguments for ssf-admin
#[derive(Parser, Debug)]
#[command(name = "ssf-admin")]
#[command(about = "Shelter severity framework administration service")]
#[command(version)]
struct Args {
    /// Folder holding ssf.db
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long, env = "SSF_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SSF_PORT")]
    port: Option<u16>,

    /// Cookie carrying the caller's role
    #[arg(long, env = "SSF_ROLE_COOKIE")]
    role_cookie: Option<String>,

    /// TOML config file (defaults to <config dir>/ssf/config.toml)
    #[arg(short, long, env = "SSF_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The config file may carry the default log filter, so it is read before
    // the subscriber exists
    let (toml, config_source) = TomlConfig::load_or_default(args.config.as_deref());

    let default_filter = toml
        .log_level
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting ssf-admin v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config_source.log();

    let config = ServiceConfig::resolve(
        CliOverrides {
            root_folder: args.root_folder,
            bind_address: args.bind_address,
            port: args.port,
            role_cookie: args.role_cookie,
        },
        &toml,
    );

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let app = build_router(AppState::new(pool.clone(), config.role_cookie.as_str()));

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    info!("ssf-admin listening on http://{}", address);
    info!("Role cookie: {}", config.role_cookie);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
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
            Ok(mut stream) => {
                stream.recv().await;
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

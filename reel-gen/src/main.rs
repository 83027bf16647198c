//! reel-gen - Short-form video generation service
//!
//! Accepts a brand brief, runs the generation pipeline in the background and
//! serves the finished MP4 under /videos. Progress via REST polling or SSE.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use reel_common::config::{default_config_path, load_toml_config, RootFolderInitializer, RootFolderResolver};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reel_gen::config::{ServiceConfig, MODULE_NAME};
use reel_gen::services::Providers;
use reel_gen::AppState;

/// Command-line arguments for reel-gen
#[derive(Parser, Debug)]
#[command(name = "reel-gen")]
#[command(about = "Brand brief to short-form video generation service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides TOML `port`)
    #[arg(short, long, env = "REEL_GEN_PORT")]
    port: Option<u16>,

    /// Root folder for output and work directories
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: <config dir>/reel/reel-gen.toml)
    #[arg(short, long, env = "REEL_GEN_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it carries the log level and log file
    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path(MODULE_NAME));
    let config: ServiceConfig = match &config_path {
        Some(path) => load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ServiceConfig::default(),
    };

    init_tracing(&config)?;

    info!("Starting reel-gen (video generation) service");
    info!("Version: {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"));
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    // Step 1: Resolve root folder
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml_root(config.root_folder.clone())
        .resolve();

    // Step 2: Create root, output and work folders if missing
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Output folder: {}", initializer.output_dir().display());

    // Step 3: Providers and pipeline
    let providers = Providers::from_config(&config).context("Failed to configure providers")?;
    let state = AppState::new(
        &config,
        providers,
        initializer.output_dir(),
        initializer.work_dir(),
    );
    info!(
        max_active_jobs = config.limits.max_active_jobs,
        max_concurrent_encoders = config.encoder.max_concurrent,
        "Generation pipeline ready"
    );

    let app = reel_gen::build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// RUST_LOG wins over the configured level; optional log file in addition to stderr
fn init_tracing(config: &ServiceConfig) -> Result<()> {
    let default_filter = format!(
        "reel_gen={level},reel_common={level},tower_http={level}",
        level = config.logging.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install signal handler: {}", e);
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

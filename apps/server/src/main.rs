//! Audio-Pi Server - HTTP control plane daemon for the Audio-Pi appliance.
//!
//! Runs as a systemd service on the device and exposes volume, service,
//! multiroom, Wi-Fi, naming and reboot control to the local web UI.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use audiopi_core::{bootstrap_services, start_server, AppState};
use clap::Parser;
use tokio::signal;

use crate::config::ServerConfig;

/// Audio-Pi Server - local control plane for a single-board audio appliance.
#[derive(Parser, Debug)]
#[command(name = "audiopi-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the server configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "AUDIO_PI_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "AUDIO_PI_BIND_PORT")]
    port: Option<u16>,

    /// Directory with the web UI (overrides config file).
    #[arg(short = 's', long, env = "AUDIO_PI_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Path of the persisted device document (overrides config file).
    #[arg(short = 'd', long, env = "AUDIO_PI_CONFIG")]
    device_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Audio-Pi Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(dir) = args.static_dir {
        config.static_dir = Some(dir);
    }
    if let Some(path) = args.device_config {
        config.device_config_path = path;
    }

    log::info!(
        "Configuration: bind={}:{}, command_timeout={}s, device_config={}",
        config.bind_address,
        config.bind_port,
        config.command_timeout_secs,
        config.device_config_path.display()
    );

    let services =
        bootstrap_services(config.to_core_config()).context("Failed to bootstrap services")?;
    log::info!("Services bootstrapped successfully");

    let app_state = AppState::new(&services);
    let mut server = tokio::spawn(start_server(app_state, services.cancel_token.clone()));

    // Wait for shutdown signal, or for the server to stop on its own
    tokio::select! {
        result = &mut server => {
            result
                .context("Server task failed")?
                .context("HTTP server stopped")?;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    log::info!("Shutdown signal received, cleaning up...");

    services.shutdown();
    server
        .await
        .context("Server task failed")?
        .context("HTTP server stopped with an error")?;

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
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
                log::error!("Failed to install SIGTERM handler: {}", e);
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

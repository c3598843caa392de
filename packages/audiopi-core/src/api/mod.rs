//! HTTP API layer.
//!
//! This module contains thin handlers that delegate to services.
//! It provides the router construction and server startup functionality.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, Method};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::bootstrap::BootstrappedServices;
use crate::device_config::ConfigStore;
use crate::services::{
    MultiroomCoordinator, ServiceRegistry, SystemService, VolumeService, WifiService,
};
use crate::state::Config;

pub mod http;
pub mod response;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listening socket or serve on it.
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error after binding.
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
/// All business logic lives in the services themselves.
#[derive(Clone)]
pub struct AppState {
    pub volume: Arc<VolumeService>,
    pub registry: Arc<ServiceRegistry>,
    pub multiroom: Arc<MultiroomCoordinator>,
    pub wifi: Arc<WifiService>,
    pub system: Arc<SystemService>,
    pub device_config: Arc<ConfigStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the API state from bootstrapped services.
    pub fn new(services: &BootstrappedServices) -> Self {
        Self {
            volume: Arc::clone(&services.volume),
            registry: Arc::clone(&services.registry),
            multiroom: Arc::clone(&services.multiroom),
            wifi: Arc::clone(&services.wifi),
            system: Arc::clone(&services.system),
            device_config: Arc::clone(&services.device_config),
            config: Arc::clone(&services.config),
        }
    }
}

/// Starts the HTTP server and runs until `shutdown` is cancelled.
///
/// In-flight requests are allowed to finish; commands they spawned keep
/// running on their own tasks regardless.
pub async fn start_server(state: AppState, shutdown: CancellationToken) -> Result<(), ServerError> {
    let addr = SocketAddr::new(state.config.bind_address, state.config.bind_port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    // The UI is normally same-origin; this lets a dev server on another
    // port talk to a device on the LAN.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let app = http::create_router(state).layer(cors);

    log::info!("[Server] Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    log::info!("[Server] Stopped");
    Ok(())
}

//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. Tests swap the command
//! runner through [`bootstrap_with_runner`]; everything else is built the
//! same way as in production.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::audio::MixerLocator;
use crate::device_config::ConfigStore;
use crate::error::{AudioPiError, AudioPiResult};
use crate::exec::{CommandRunner, TokioCommandRunner, Tools};
use crate::services::{
    MultiroomCoordinator, ServiceRegistry, SystemService, VolumeService, WifiService,
};
use crate::state::Config;

/// Container for all bootstrapped services.
///
/// It's consumed by `AppState` to build the final application state.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Validated configuration.
    pub config: Arc<Config>,
    /// Executor shared by every service.
    pub runner: Arc<dyn CommandRunner>,
    /// Lazily discovered output mixer.
    pub mixer: Arc<MixerLocator>,
    pub volume: Arc<VolumeService>,
    pub registry: Arc<ServiceRegistry>,
    pub multiroom: Arc<MultiroomCoordinator>,
    pub wifi: Arc<WifiService>,
    pub system: Arc<SystemService>,
    pub device_config: Arc<ConfigStore>,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Stops the HTTP server. Commands already dispatched run to completion.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");
        self.cancel_token.cancel();
    }
}

/// Bootstraps all services with the production command runner.
///
/// # Errors
///
/// Returns [`AudioPiError::Configuration`] if the configuration is invalid.
pub fn bootstrap_services(config: Config) -> AudioPiResult<BootstrappedServices> {
    let runner: Arc<dyn CommandRunner> =
        Arc::new(TokioCommandRunner::new(config.command_timeout()));
    bootstrap_with_runner(config, runner)
}

/// Bootstraps all services on top of the given command runner.
pub fn bootstrap_with_runner(
    config: Config,
    runner: Arc<dyn CommandRunner>,
) -> AudioPiResult<BootstrappedServices> {
    config.validate().map_err(AudioPiError::Configuration)?;

    let tools = Arc::new(Tools::new(
        config.tools.clone(),
        config.privilege_command.clone(),
    ));

    let mixer = Arc::new(MixerLocator::new(
        Arc::clone(&runner),
        Arc::clone(&tools),
        config.mixer.clone(),
    ));
    let curve = config.volume.build();
    log::info!("[Bootstrap] Volume strategy: {:?}", curve);

    let volume = Arc::new(VolumeService::new(
        Arc::clone(&runner),
        Arc::clone(&tools),
        Arc::clone(&mixer),
        curve,
    ));

    let registry = Arc::new(ServiceRegistry::new(
        Arc::clone(&runner),
        Arc::clone(&tools),
        config.services.clone(),
    ));
    let multiroom = Arc::new(MultiroomCoordinator::new(Arc::clone(&registry)));

    let wifi = Arc::new(WifiService::new(Arc::clone(&runner), Arc::clone(&tools)));
    let system = Arc::new(SystemService::new(Arc::clone(&runner), Arc::clone(&tools)));

    let device_config = Arc::new(ConfigStore::new(
        config.device_config_path.clone(),
        config.default_device_name.clone(),
    ));
    log::info!(
        "[Bootstrap] Device config at {}",
        config.device_config_path.display()
    );

    Ok(BootstrappedServices {
        config: Arc::new(config),
        runner,
        mixer,
        volume,
        registry,
        multiroom,
        wifi,
        system,
        device_config,
        cancel_token: CancellationToken::new(),
    })
}

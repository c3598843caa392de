//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use audiopi_core::exec::ToolPaths;
use audiopi_core::{MixerConfig, ServiceUnits, VolumeStrategy};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_address: IpAddr,

    /// Port to bind the HTTP server to.
    /// Override: `AUDIO_PI_BIND_PORT`
    pub bind_port: u16,

    /// Directory holding `index.html` and the `static/` assets of the web UI.
    /// Override: `AUDIO_PI_STATIC_DIR`
    pub static_dir: Option<PathBuf>,

    /// Upper bound on any external command, in seconds.
    /// Override: `AUDIO_PI_COMMAND_TIMEOUT`
    pub command_timeout_secs: u64,

    /// Argv prefix for privileged commands.
    pub privilege_command: Vec<String>,

    pub tools: ToolPaths,

    pub mixer: MixerConfig,

    pub volume: VolumeStrategy,

    /// Logical service name to systemd unit.
    pub services: ServiceUnits,

    /// Persisted device document.
    /// Override: `AUDIO_PI_CONFIG`
    pub device_config_path: PathBuf,

    pub default_device_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = audiopi_core::Config::default();
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            bind_port: core.bind_port,
            static_dir: None,
            command_timeout_secs: core.command_timeout_secs,
            privilege_command: core.privilege_command,
            tools: core.tools,
            mixer: core.mixer,
            volume: core.volume,
            services: core.services,
            device_config_path: core.device_config_path,
            default_device_name: core.default_device_name,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides looked up by environment variable name.
    ///
    /// Unparseable values are ignored. `AUDIO_PI_STATIC_DIR` and
    /// `AUDIO_PI_CONFIG` are also accepted by clap in main.rs, so CLI flags
    /// win over both.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("AUDIO_PI_BIND_PORT").and_then(|v| v.parse().ok()) {
            self.bind_port = port;
        }

        if let Some(secs) = lookup("AUDIO_PI_COMMAND_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.command_timeout_secs = secs;
        }

        if let Some(path) = lookup("AUDIO_PI_CONFIG").filter(|v| !v.is_empty()) {
            self.device_config_path = PathBuf::from(path);
        }

        if let Some(dir) = lookup("AUDIO_PI_STATIC_DIR").filter(|v| !v.is_empty()) {
            self.static_dir = Some(PathBuf::from(dir));
        }
    }

    /// Converts to audiopi-core's Config type.
    pub fn to_core_config(&self) -> audiopi_core::Config {
        audiopi_core::Config {
            bind_address: self.bind_address,
            bind_port: self.bind_port,
            static_dir: self.static_dir.clone(),
            command_timeout_secs: self.command_timeout_secs,
            privilege_command: self.privilege_command.clone(),
            tools: self.tools.clone(),
            mixer: self.mixer.clone(),
            volume: self.volume.clone(),
            services: self.services.clone(),
            device_config_path: self.device_config_path.clone(),
            default_device_name: self.default_device_name.clone(),
        }
    }
}

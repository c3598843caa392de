//! Core configuration types.
//!
//! [`Config`] holds everything the control plane needs to decide which
//! commands to run: tool paths, privilege prefix, mixer preferences, volume
//! strategy, the service unit table and where the device document lives.
//! All fields have defaults matching a stock Raspberry Pi audio image.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::curve::VolumeStrategy;
use crate::exec::ToolPaths;
use crate::services::registry::ServiceUnits;

/// Mixer discovery preferences.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MixerConfig {
    /// Substrings identifying the on-board headphone card (matched against
    /// card id and name, case-insensitively). Matching cards are tried first.
    pub preferred_cards: Vec<String>,

    /// Control names to look for, most specific first.
    pub controls: Vec<String>,

    /// Control used on card 0 when nothing matches.
    pub default_control: String,

    /// Pin the card instead of discovering it. Takes effect only together
    /// with `control`.
    pub card: Option<u32>,

    /// Pin the control instead of discovering it.
    pub control: Option<String>,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            preferred_cards: vec!["Headphones".into(), "bcm2835".into()],
            controls: vec![
                "PCM".into(),
                "Headphone".into(),
                "Master".into(),
                "Speaker".into(),
                "Digital".into(),
            ],
            default_control: "PCM".into(),
            card: None,
            control: None,
        }
    }
}

impl MixerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.controls.iter().all(|c| c.trim().is_empty()) {
            return Err("mixer.controls must name at least one control".to_string());
        }
        if self.default_control.trim().is_empty() {
            return Err("mixer.default_control must not be empty".to_string());
        }
        Ok(())
    }
}

/// Configuration for the Audio-Pi control plane.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Server
    /// Address the HTTP server binds to.
    pub bind_address: IpAddr,

    /// Port the HTTP server binds to.
    pub bind_port: u16,

    /// Directory of static UI files served for unmatched routes.
    pub static_dir: Option<PathBuf>,

    // Commands
    /// Upper bound on any single external command (seconds).
    pub command_timeout_secs: u64,

    /// Argv prefix for privileged commands. Empty runs them directly.
    pub privilege_command: Vec<String>,

    /// Paths of the external tools.
    pub tools: ToolPaths,

    // Audio
    pub mixer: MixerConfig,

    pub volume: VolumeStrategy,

    // Services
    /// Logical service name to service-manager unit.
    pub services: ServiceUnits,

    // Device
    /// Location of the persisted device document.
    pub device_config_path: PathBuf,

    /// Name reported when the document has none.
    pub default_device_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            bind_port: 8080,
            static_dir: None,
            command_timeout_secs: 10,
            privilege_command: vec!["sudo".into(), "-n".into()],
            tools: ToolPaths::default(),
            mixer: MixerConfig::default(),
            volume: VolumeStrategy::default(),
            services: ServiceUnits::default(),
            device_config_path: PathBuf::from("/etc/audio-pi/config.json"),
            default_device_name: "Audio-Pi".into(),
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.command_timeout_secs == 0 {
            return Err("command_timeout_secs must be >= 1".to_string());
        }
        self.mixer.validate()?;
        self.volume.validate()?;
        Ok(())
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

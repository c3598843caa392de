//! Audio-Pi Core - control plane library for the Audio-Pi appliance.
//!
//! The appliance is a single-board computer driving an analog output. This
//! crate decides which OS commands to run (`amixer`, `aplay`, `systemctl`,
//! `nmcli`, `reboot`) and how to read their output; it never touches audio
//! or the network stack itself.
//!
//! # Architecture
//!
//! - [`exec`]: argv-only command execution behind the [`CommandRunner`] trait
//! - [`audio`]: mixer discovery, `amixer` parsing and volume curves
//! - [`services`]: volume, service units, multiroom, Wi-Fi and reboot
//! - [`device_config`]: the persisted device document
//! - [`state`]: configuration
//! - [`api`]: axum router and server
//! - [`bootstrap`]: composition root
//!
//! # Abstraction Traits
//!
//! - [`CommandRunner`]: runs external commands; swapped for a scripted fake
//!   in tests
//! - [`VolumeCurve`]: maps the 0-100 UI scale to hardware levels

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod audio;
pub mod bootstrap;
pub mod device_config;
pub mod error;
pub mod exec;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_fixtures;

/// Identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "audio-pi";

pub use error::{AudioPiError, AudioPiResult, ErrorCode};
pub use exec::{CommandError, CommandRunner, Invocation, TokioCommandRunner, Tools};
pub use state::{Config, MixerConfig};

pub use audio::{MixerLocator, MixerSelection, VolumeCurve, VolumeStrategy};
pub use device_config::{ConfigStore, DeviceConfig};
pub use services::{LogicalService, MultiroomMode, ServiceUnits};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, bootstrap_with_runner, BootstrappedServices};

// Re-export API types
pub use api::{start_server, AppState, ServerError};

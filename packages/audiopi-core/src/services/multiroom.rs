//! Multiroom coordinator: switches the device between Snapcast server,
//! Snapcast client, or neither.
//!
//! The mode is never stored; it is derived from the observed state of the
//! two units. A transition runs two independent registry calls with no
//! rollback, so a half-applied switch shows up in the returned state rather
//! than as an error.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use super::registry::{LogicalService, ServiceRegistry, UnitState};
use crate::error::AudioPiError;
use crate::exec::CommandReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiroomMode {
    Server,
    Client,
    Off,
}

impl MultiroomMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
            Self::Off => "off",
        }
    }

    /// Ordered `(service, enable)` steps that realize this mode.
    #[must_use]
    pub fn plan(&self) -> [(LogicalService, bool); 2] {
        use LogicalService::{Snapclient, Snapserver};
        match self {
            Self::Server => [(Snapserver, true), (Snapclient, false)],
            Self::Client => [(Snapclient, true), (Snapserver, false)],
            Self::Off => [(Snapserver, false), (Snapclient, false)],
        }
    }

    /// Derives the mode from whether each unit is engaged (enabled or
    /// running). Both engaged is inconsistent and yields `None`.
    #[must_use]
    pub fn derive(server_engaged: bool, client_engaged: bool) -> Option<Self> {
        match (server_engaged, client_engaged) {
            (true, false) => Some(Self::Server),
            (false, true) => Some(Self::Client),
            (false, false) => Some(Self::Off),
            (true, true) => None,
        }
    }
}

impl fmt::Display for MultiroomMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MultiroomMode {
    type Err = AudioPiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "server" => Ok(Self::Server),
            "client" => Ok(Self::Client),
            "off" => Ok(Self::Off),
            _ => Err(AudioPiError::InvalidRequest(
                "mode must be server, client, or off".into(),
            )),
        }
    }
}

/// One enable/disable half-step of a transition.
#[derive(Debug, Clone, Serialize)]
pub struct MultiroomStep {
    pub service: LogicalService,
    pub enable: bool,
    pub result: CommandReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnabledPair {
    pub snapserver: UnitState,
    pub snapclient: UnitState,
}

/// Outcome of a transition, with both units' state read afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct MultiroomReport {
    /// All steps exited successfully.
    pub ok: bool,
    /// Requested mode.
    pub mode: MultiroomMode,
    pub snapserver: UnitState,
    pub snapclient: UnitState,
    pub enabled: EnabledPair,
    pub steps: Vec<MultiroomStep>,
}

pub struct MultiroomCoordinator {
    registry: Arc<ServiceRegistry>,
}

impl MultiroomCoordinator {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    /// Applies `mode`. Both steps are always attempted.
    pub async fn transition(&self, mode: MultiroomMode) -> MultiroomReport {
        log::info!("[Multiroom] Switching to {}", mode);

        let mut steps = Vec::with_capacity(2);
        for (service, enable) in mode.plan() {
            let result = self.registry.set_enabled(service, enable, true).await;
            steps.push(MultiroomStep {
                service,
                enable,
                result,
            });
        }

        let ok = steps.iter().all(|s| s.result.ok);
        if !ok {
            log::warn!("[Multiroom] Switch to {} only partially applied", mode);
        }

        let (snapserver, snapclient, server_enabled, client_enabled) = futures::join!(
            self.registry.status(LogicalService::Snapserver),
            self.registry.status(LogicalService::Snapclient),
            self.registry.enabled_state(LogicalService::Snapserver),
            self.registry.enabled_state(LogicalService::Snapclient),
        );

        MultiroomReport {
            ok,
            mode,
            snapserver,
            snapclient,
            enabled: EnabledPair {
                snapserver: server_enabled,
                snapclient: client_enabled,
            },
            steps,
        }
    }

    /// Mode implied by the current unit state, `None` if both are engaged.
    pub async fn current_mode(&self) -> Option<MultiroomMode> {
        let (server_active, server_enabled, client_active, client_enabled) = futures::join!(
            self.registry.status(LogicalService::Snapserver),
            self.registry.enabled_state(LogicalService::Snapserver),
            self.registry.status(LogicalService::Snapclient),
            self.registry.enabled_state(LogicalService::Snapclient),
        );
        MultiroomMode::derive(
            server_active.is_active() || server_enabled.is_enabled(),
            client_active.is_active() || client_enabled.is_enabled(),
        )
    }
}

//! Service registry: logical audio services mapped onto systemd units.
//!
//! This module provides a single source of truth for which unit backs each
//! logical service, and the operations the API performs on them. Status
//! queries never fail - an unreachable or absent unit reads as `unknown`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::{AudioPiError, AudioPiResult};
use crate::exec::{CommandReport, CommandRunner, Tool, Tools};

// ─────────────────────────────────────────────────────────────────────────────
// Logical services
// ─────────────────────────────────────────────────────────────────────────────

/// Audio services the appliance can run.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalService {
    /// Bluetooth audio sink.
    Bluetooth,
    /// AirPlay receiver.
    Airplay,
    /// Spotify Connect client.
    Spotify,
    /// Snapcast multiroom server.
    Snapserver,
    /// Snapcast multiroom client.
    Snapclient,
}

impl LogicalService {
    pub const ALL: [Self; 5] = [
        Self::Bluetooth,
        Self::Airplay,
        Self::Spotify,
        Self::Snapserver,
        Self::Snapclient,
    ];

    /// Name used in API paths and responses.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bluetooth => "bluetooth",
            Self::Airplay => "airplay",
            Self::Spotify => "spotify",
            Self::Snapserver => "snapserver",
            Self::Snapclient => "snapclient",
        }
    }

    /// Unit name on a stock image.
    #[must_use]
    pub fn default_unit(&self) -> &'static str {
        match self {
            Self::Bluetooth => "bluetooth",
            Self::Airplay => "shairport-sync",
            Self::Spotify => "raspotify",
            Self::Snapserver => "snapserver",
            Self::Snapclient => "snapclient",
        }
    }
}

impl fmt::Display for LogicalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogicalService {
    type Err = AudioPiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|svc| svc.name() == s)
            .ok_or_else(|| AudioPiError::InvalidRequest(format!("Invalid service: {}", s)))
    }
}

/// Lifecycle actions exposed over the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

impl FromStr for ServiceAction {
    type Err = AudioPiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            _ => Err(AudioPiError::InvalidRequest(format!("Invalid action: {}", s))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unit table
// ─────────────────────────────────────────────────────────────────────────────

/// Logical service to unit name table.
///
/// Services missing from a configured table use their
/// [`default_unit`](LogicalService::default_unit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceUnits(BTreeMap<LogicalService, String>);

impl Default for ServiceUnits {
    fn default() -> Self {
        Self(
            LogicalService::ALL
                .into_iter()
                .map(|svc| (svc, svc.default_unit().to_string()))
                .collect(),
        )
    }
}

impl ServiceUnits {
    #[must_use]
    pub fn unit(&self, service: LogicalService) -> &str {
        self.0
            .get(&service)
            .map(String::as_str)
            .unwrap_or_else(|| service.default_unit())
    }
}

impl FromIterator<(LogicalService, String)> for ServiceUnits {
    fn from_iter<I: IntoIterator<Item = (LogicalService, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Observed state
// ─────────────────────────────────────────────────────────────────────────────

/// A unit's state as printed by `systemctl is-active` / `is-enabled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UnitState(String);

impl UnitState {
    pub fn unknown() -> Self {
        Self("unknown".into())
    }

    /// First non-empty stdout line, or `unknown`.
    pub fn from_output(stdout: &str) -> Self {
        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| Self(line.to_string()))
            .unwrap_or_else(Self::unknown)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.0 == "active"
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.0 == "enabled" || self.0 == "enabled-runtime"
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response for a start/stop/restart request.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceActionReport {
    pub ok: bool,
    /// Active state read after the action.
    pub status: UnitState,
    pub detail: CommandReport,
}

/// Active and enabled state for every logical service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSnapshot {
    pub services: BTreeMap<LogicalService, UnitState>,
    pub enabled: BTreeMap<LogicalService, UnitState>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

pub struct ServiceRegistry {
    runner: Arc<dyn CommandRunner>,
    tools: Arc<Tools>,
    units: ServiceUnits,
}

impl ServiceRegistry {
    pub fn new(runner: Arc<dyn CommandRunner>, tools: Arc<Tools>, units: ServiceUnits) -> Self {
        Self {
            runner,
            tools,
            units,
        }
    }

    #[must_use]
    pub fn unit(&self, service: LogicalService) -> &str {
        self.units.unit(service)
    }

    /// `systemctl is-active` for the service's unit.
    pub async fn status(&self, service: LogicalService) -> UnitState {
        self.query("is-active", service).await
    }

    /// `systemctl is-enabled` for the service's unit.
    pub async fn enabled_state(&self, service: LogicalService) -> UnitState {
        self.query("is-enabled", service).await
    }

    async fn query(&self, verb: &str, service: LogicalService) -> UnitState {
        let invocation = self
            .tools
            .command(Tool::Systemctl)
            .args([verb, self.unit(service)]);

        // Non-zero exits are normal here ("inactive" exits 3), so only the
        // printed state matters.
        match self.runner.run(&invocation).await {
            Ok(output) => UnitState::from_output(&output.stdout),
            Err(e) => {
                log::debug!("[Services] {} {} failed: {}", verb, service, e);
                UnitState::unknown()
            }
        }
    }

    /// Parses `name` and `action` and applies the action.
    ///
    /// Unknown names or actions are rejected before any command runs.
    pub async fn apply(&self, name: &str, action: &str) -> AudioPiResult<ServiceActionReport> {
        let action: ServiceAction = action.parse()?;
        let service: LogicalService = name.parse()?;
        Ok(self.apply_action(service, action).await)
    }

    /// Runs `systemctl <action> <unit>` and reads back the active state.
    pub async fn apply_action(
        &self,
        service: LogicalService,
        action: ServiceAction,
    ) -> ServiceActionReport {
        let unit = self.unit(service);
        let invocation = self
            .tools
            .privileged(Tool::Systemctl)
            .args([action.as_str(), unit]);

        let detail = CommandReport::from_result(&self.runner.run(&invocation).await);
        if detail.ok {
            log::info!("[Services] {} {} ({})", action.as_str(), service, unit);
        } else {
            log::warn!(
                "[Services] {} {} failed: {}",
                action.as_str(),
                service,
                detail.text()
            );
        }

        ServiceActionReport {
            ok: detail.ok,
            status: self.status(service).await,
            detail,
        }
    }

    /// Enables or disables the unit, optionally starting/stopping it too
    /// (`--now`).
    pub async fn set_enabled(
        &self,
        service: LogicalService,
        enabled: bool,
        also_apply: bool,
    ) -> CommandReport {
        let verb = if enabled { "enable" } else { "disable" };
        let mut invocation = self.tools.privileged(Tool::Systemctl).arg(verb);
        if also_apply {
            invocation = invocation.arg("--now");
        }
        let invocation = invocation.arg(self.unit(service));

        let report = CommandReport::from_result(&self.runner.run(&invocation).await);
        if report.ok {
            log::info!("[Services] {} {}", verb, service);
        } else {
            log::warn!("[Services] {} {} failed: {}", verb, service, report.text());
        }
        report
    }

    /// Active and enabled state of all services, queried concurrently.
    pub async fn snapshot(&self) -> ServiceSnapshot {
        let active = join_all(LogicalService::ALL.map(|svc| self.status(svc)));
        let enabled = join_all(LogicalService::ALL.map(|svc| self.enabled_state(svc)));
        let (active, enabled) = futures::join!(active, enabled);

        ServiceSnapshot {
            services: LogicalService::ALL.into_iter().zip(active).collect(),
            enabled: LogicalService::ALL.into_iter().zip(enabled).collect(),
        }
    }
}

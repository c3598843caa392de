//! Wi-Fi provisioning through NetworkManager.
//!
//! A raw `nmcli` scan lists one line per access point, so the same network
//! shows up once per radio and band. [`reduce_scan`] collapses that into one
//! entry per SSID, strongest first.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{AudioPiError, AudioPiResult};
use crate::exec::{CommandReport, CommandRunner, Tool, Tools};

/// A visible network after deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WifiNetwork {
    pub ssid: String,
    /// Signal quality, 0-100.
    pub signal: u8,
    pub security: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Scan Reduction
// ─────────────────────────────────────────────────────────────────────────────

/// Splits one line of `nmcli -t` output on unescaped colons.
///
/// `\:` becomes `:` and `\\` becomes `\` inside a field.
pub fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parses an SSID/SIGNAL/SECURITY line. Short lines and hidden networks
/// (empty SSID) yield `None`.
pub fn parse_scan_line(line: &str) -> Option<WifiNetwork> {
    let mut fields = split_terse(line).into_iter();
    let ssid = fields.next()?;
    let signal = fields.next()?;
    let security = fields.next()?;

    if ssid.is_empty() {
        return None;
    }

    let signal = signal
        .trim()
        .parse::<i64>()
        .map(|s| s.clamp(0, 100) as u8)
        .unwrap_or(0);

    Some(WifiNetwork {
        ssid,
        signal,
        security,
    })
}

/// One entry per SSID, keeping the strongest signal (the first seen wins a
/// tie), sorted by signal descending. Equal signals keep first-seen order.
pub fn reduce_networks<I>(networks: I) -> Vec<WifiNetwork>
where
    I: IntoIterator<Item = WifiNetwork>,
{
    let mut best: Vec<WifiNetwork> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for network in networks {
        match index.get(&network.ssid) {
            Some(&i) => {
                if network.signal > best[i].signal {
                    best[i] = network;
                }
            }
            None => {
                index.insert(network.ssid.clone(), best.len());
                best.push(network);
            }
        }
    }

    best.sort_by(|a, b| b.signal.cmp(&a.signal));
    best
}

/// Parses and reduces a full terse scan listing.
pub fn reduce_scan(output: &str) -> Vec<WifiNetwork> {
    reduce_networks(output.lines().filter_map(parse_scan_line))
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct WifiScan {
    pub ok: bool,
    pub networks: Vec<WifiNetwork>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WifiConnectResult {
    pub ok: bool,
    /// nmcli's message (stdout, or stderr when stdout is empty).
    pub result: String,
    pub code: i32,
}

pub struct WifiService {
    runner: Arc<dyn CommandRunner>,
    tools: Arc<Tools>,
}

impl WifiService {
    pub fn new(runner: Arc<dyn CommandRunner>, tools: Arc<Tools>) -> Self {
        Self { runner, tools }
    }

    /// Lists visible networks. Scan failures are reported, not raised.
    pub async fn scan(&self) -> WifiScan {
        let invocation = self.tools.privileged(Tool::Nmcli).args([
            "-t",
            "-f",
            "SSID,SIGNAL,SECURITY",
            "dev",
            "wifi",
            "list",
        ]);

        match self.runner.run(&invocation).await {
            Ok(output) if output.success() => {
                let networks = reduce_scan(&output.stdout);
                log::debug!("[Wifi] Scan found {} networks", networks.len());
                WifiScan {
                    ok: true,
                    networks,
                    error: None,
                }
            }
            Ok(output) => {
                log::warn!("[Wifi] Scan failed: {}", output.text());
                WifiScan {
                    ok: false,
                    networks: Vec::new(),
                    error: Some(output.text().to_string()),
                }
            }
            Err(e) => {
                log::warn!("[Wifi] Scan failed: {}", e);
                WifiScan {
                    ok: false,
                    networks: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Connects to `ssid`. An empty password is treated as an open network.
    pub async fn connect(
        &self,
        ssid: &str,
        password: Option<&str>,
    ) -> AudioPiResult<WifiConnectResult> {
        if ssid.is_empty() {
            return Err(AudioPiError::InvalidRequest("ssid must not be empty".into()));
        }

        let mut invocation = self
            .tools
            .privileged(Tool::Nmcli)
            .args(["dev", "wifi", "connect", ssid]);
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            invocation = invocation.arg("password").secret_arg(password);
        }

        log::info!("[Wifi] Connecting to '{}'", ssid);
        let report = CommandReport::from_result(&self.runner.run(&invocation).await);
        if !report.ok {
            log::warn!("[Wifi] Connect to '{}' failed: {}", ssid, report.text());
        }

        Ok(WifiConnectResult {
            ok: report.ok,
            result: report.text().to_string(),
            code: report.code,
        })
    }
}

//! Shared test fixtures: a scripted [`CommandRunner`] and canned tool output.
//!
//! `FakeRunner` records every argv it is asked to run. Replies come from
//! substring rules (first match wins); `systemctl` calls without a matching
//! rule are answered by a small in-memory unit table so enable/disable/start/
//! stop sequences can be observed afterwards.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::exec::{
    CommandError, CommandOutput, CommandResult, CommandRunner, Invocation, ToolPaths, Tools,
};

pub const APLAY_PI: &str = "\
**** List of PLAYBACK Hardware Devices ****
card 0: vc4hdmi [vc4-hdmi], device 0: MAI PCM i2s-hifi-0 [MAI PCM i2s-hifi-0]
  Subdevices: 1/1
card 1: Headphones [bcm2835 Headphones], device 0: bcm2835 Headphones [bcm2835 Headphones]
  Subdevices: 8/8
card 2: Device [USB Audio Device], device 0: USB Audio [USB Audio]
";

pub const AMIXER_GET_PCM: &str = "\
Simple mixer control 'PCM',0
  Capabilities: pvolume pvolume-joined pswitch pswitch-joined
  Playback channels: Mono
  Limits: Playback -10239 - 400
  Mono: Playback -2000 [77%] [-20.00dB] [on]
";

/// Canned reply for a rule.
#[derive(Debug, Clone)]
pub enum FakeReply {
    Output {
        code: i32,
        stdout: String,
        stderr: String,
    },
    Timeout,
    Missing,
}

impl FakeReply {
    pub fn ok(stdout: &str) -> Self {
        Self::Output {
            code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn fail(code: i32, stderr: &str) -> Self {
        Self::Output {
            code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    fn into_result(self, program: &str) -> CommandResult<CommandOutput> {
        match self {
            Self::Output {
                code,
                stdout,
                stderr,
            } => Ok(CommandOutput {
                code: Some(code),
                stdout,
                stderr,
            }),
            Self::Timeout => Err(CommandError::Timeout {
                program: program.to_string(),
                timeout: Duration::from_secs(10),
            }),
            Self::Missing => Err(CommandError::Spawn {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct UnitEntry {
    active: &'static str,
    enabled: &'static str,
}

impl Default for UnitEntry {
    fn default() -> Self {
        Self {
            active: "inactive",
            enabled: "disabled",
        }
    }
}

#[derive(Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<(String, FakeReply)>>,
    units: Mutex<HashMap<String, UnitEntry>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replies with `reply` to any argv whose space-joined form contains `pattern`.
    pub fn on(&self, pattern: &str, reply: FakeReply) -> &Self {
        self.rules.lock().push((pattern.to_string(), reply));
        self
    }

    /// Drops every reply rule; recorded calls and unit state are kept.
    pub fn clear_rules(&self) {
        self.rules.lock().clear();
    }

    /// Seeds the emulated state of a unit.
    pub fn set_unit(&self, unit: &str, active: &'static str, enabled: &'static str) {
        self.units
            .lock()
            .insert(unit.to_string(), UnitEntry { active, enabled });
    }

    /// All recorded argvs, space-joined.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|argv| argv.join(" ")).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn systemctl(&self, args: &[String]) -> FakeReply {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let mut units = self.units.lock();
        let (verb, unit) = match args.as_slice() {
            [verb, "--now", unit] => (format!("{} --now", verb), *unit),
            [verb, unit] => (verb.to_string(), *unit),
            _ => return FakeReply::fail(1, "unsupported systemctl call"),
        };
        let entry = units.entry(unit.to_string()).or_default();
        match verb.as_str() {
            "is-active" => FakeReply::Output {
                code: if entry.active == "active" { 0 } else { 3 },
                stdout: format!("{}\n", entry.active),
                stderr: String::new(),
            },
            "is-enabled" => FakeReply::Output {
                code: if entry.enabled == "enabled" { 0 } else { 1 },
                stdout: format!("{}\n", entry.enabled),
                stderr: String::new(),
            },
            "start" | "restart" => {
                entry.active = "active";
                FakeReply::ok("")
            }
            "stop" => {
                entry.active = "inactive";
                FakeReply::ok("")
            }
            "enable" => {
                entry.enabled = "enabled";
                FakeReply::ok("")
            }
            "enable --now" => {
                entry.enabled = "enabled";
                entry.active = "active";
                FakeReply::ok("")
            }
            "disable" => {
                entry.enabled = "disabled";
                FakeReply::ok("")
            }
            "disable --now" => {
                entry.enabled = "disabled";
                entry.active = "inactive";
                FakeReply::ok("")
            }
            _ => FakeReply::fail(1, "unknown verb"),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> CommandResult<CommandOutput> {
        let argv: Vec<String> = invocation.argv().into_iter().map(String::from).collect();
        let joined = argv.join(" ");
        self.calls.lock().push(argv.clone());

        let rule = self
            .rules
            .lock()
            .iter()
            .find(|(pattern, _)| joined.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());

        let reply = match rule {
            Some(reply) => reply,
            None => match argv.iter().position(|a| a.ends_with("systemctl")) {
                Some(pos) => self.systemctl(&argv[pos + 1..]),
                None => FakeReply::ok(""),
            },
        };

        reply.into_result(invocation.program())
    }
}

/// Tool set with default paths and a `sudo -n` prefix.
pub fn test_tools() -> Arc<Tools> {
    Arc::new(Tools::new(
        ToolPaths::default(),
        vec!["sudo".into(), "-n".into()],
    ))
}

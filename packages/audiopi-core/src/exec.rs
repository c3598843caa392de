//! External command execution.
//!
//! Every interaction with the operating system (mixer, service manager,
//! network manager, reboot) goes through the [`CommandRunner`] trait. Commands
//! are always argv vectors - nothing is ever handed to a shell, so user input
//! such as an SSID or password cannot change what gets executed.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorCode;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that prevent a command from producing an exit status.
///
/// A command that runs and exits non-zero is NOT an error at this level; it
/// is reported through [`CommandOutput::code`].
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started (missing binary, permission denied).
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish within the configured timeout.
    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    /// The task driving the child process panicked or was aborted.
    #[error("Command task for {program} failed: {message}")]
    Join { program: String, message: String },
}

impl ErrorCode for CommandError {
    fn code(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "command_spawn_failed",
            Self::Timeout { .. } => "command_timeout",
            Self::Join { .. } => "command_task_failed",
        }
    }
}

/// Convenient Result alias for command execution.
pub type CommandResult<T> = Result<T, CommandError>;

// ─────────────────────────────────────────────────────────────────────────────
// Invocation
// ─────────────────────────────────────────────────────────────────────────────

/// A program plus its argument vector.
///
/// Arguments added with [`Invocation::secret_arg`] are masked in the
/// `Display` output so passwords never reach the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    secret: Vec<usize>,
}

impl Invocation {
    /// Creates an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secret: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends an argument that must not appear in logs.
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arg_list(&self) -> &[String] {
        &self.args
    }

    /// Returns the full argv (program first).
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for (i, arg) in self.args.iter().enumerate() {
            if self.secret.contains(&i) {
                f.write_str(" ***")?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stdout, falling back to trimmed stderr when stdout is empty.
    #[must_use]
    pub fn text(&self) -> &str {
        let out = self.stdout.trim();
        if out.is_empty() {
            self.stderr.trim()
        } else {
            out
        }
    }
}

/// Serializable summary of a command attempt, returned to API callers.
///
/// Executor failures (spawn, timeout) become `ok: false, code: -1` with the
/// error message in `stderr` and a machine-readable `error` code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandReport {
    pub ok: bool,
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl CommandReport {
    pub fn from_result(result: &CommandResult<CommandOutput>) -> Self {
        match result {
            Ok(output) => Self {
                ok: output.success(),
                code: output.code.unwrap_or(-1),
                stdout: output.stdout.trim().to_string(),
                stderr: output.stderr.trim().to_string(),
                error: None,
            },
            Err(e) => Self {
                ok: false,
                code: -1,
                stdout: String::new(),
                stderr: e.to_string(),
                error: Some(e.code()),
            },
        }
    }

    /// Trimmed stdout, or stderr when stdout is empty.
    pub fn text(&self) -> &str {
        if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runner
// ─────────────────────────────────────────────────────────────────────────────

/// Executes external commands.
///
/// The production implementation is [`TokioCommandRunner`]; tests substitute
/// a scripted fake.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the invocation to completion and captures its output.
    async fn run(&self, invocation: &Invocation) -> CommandResult<CommandOutput>;
}

/// Runs commands as tokio child processes with a bounded timeout.
///
/// Each child is driven on its own spawned task: if the HTTP request that
/// issued it goes away, the command still runs to completion (or timeout).
/// On timeout the child is killed.
#[derive(Debug, Clone)]
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, invocation: &Invocation) -> CommandResult<CommandOutput> {
        let program = invocation.program().to_string();
        let args = invocation.arg_list().to_vec();
        let timeout = self.timeout;

        log::debug!("[Exec] {}", invocation);

        let task = tokio::spawn({
            let program = program.clone();
            async move {
                let mut cmd = tokio::process::Command::new(&program);
                cmd.args(&args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .kill_on_drop(true);

                match tokio::time::timeout(timeout, cmd.output()).await {
                    Err(_) => Err(CommandError::Timeout { program, timeout }),
                    Ok(Err(source)) => Err(CommandError::Spawn { program, source }),
                    Ok(Ok(output)) => Ok(CommandOutput {
                        code: output.status.code(),
                        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    }),
                }
            }
        });

        let result = task.await.map_err(|e| CommandError::Join {
            program: program.clone(),
            message: e.to_string(),
        })?;

        match &result {
            Ok(output) if !output.success() => {
                log::debug!(
                    "[Exec] {} exited with {:?}: {}",
                    program,
                    output.code,
                    output.stderr.trim()
                );
            }
            Err(e) => log::warn!("[Exec] {}", e),
            _ => {}
        }

        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────────────────────────────────────

/// External tools the control plane drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Amixer,
    Aplay,
    Systemctl,
    Nmcli,
    Reboot,
}

/// Filesystem paths of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub amixer: String,
    pub aplay: String,
    pub systemctl: String,
    pub nmcli: String,
    pub reboot: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            amixer: "/usr/bin/amixer".into(),
            aplay: "/usr/bin/aplay".into(),
            systemctl: "/usr/bin/systemctl".into(),
            nmcli: "/usr/bin/nmcli".into(),
            reboot: "/usr/sbin/reboot".into(),
        }
    }
}

impl ToolPaths {
    #[must_use]
    pub fn path(&self, tool: Tool) -> &str {
        match tool {
            Tool::Amixer => &self.amixer,
            Tool::Aplay => &self.aplay,
            Tool::Systemctl => &self.systemctl,
            Tool::Nmcli => &self.nmcli,
            Tool::Reboot => &self.reboot,
        }
    }
}

/// Builds invocations for [`Tool`]s, optionally behind a privilege prefix.
#[derive(Debug, Clone)]
pub struct Tools {
    paths: ToolPaths,
    privilege: Vec<String>,
}

impl Tools {
    /// Creates a tool set. `privilege` is the argv prefix used for
    /// privileged commands (e.g. `["sudo", "-n"]`); empty means none.
    pub fn new(paths: ToolPaths, privilege: Vec<String>) -> Self {
        Self { paths, privilege }
    }

    /// An unprivileged invocation of `tool`.
    #[must_use]
    pub fn command(&self, tool: Tool) -> Invocation {
        Invocation::new(self.paths.path(tool))
    }

    /// An invocation of `tool` wrapped in the privilege prefix.
    #[must_use]
    pub fn privileged(&self, tool: Tool) -> Invocation {
        match self.privilege.split_first() {
            Some((program, rest)) => Invocation::new(program.as_str())
                .args(rest.iter().cloned())
                .arg(self.paths.path(tool)),
            None => self.command(tool),
        }
    }
}

//! Device-level operations.

use std::sync::Arc;

use serde::Serialize;

use crate::exec::{CommandReport, CommandRunner, Tool, Tools};

#[derive(Debug, Clone, Serialize)]
pub struct RebootResult {
    pub ok: bool,
    pub code: i32,
}

pub struct SystemService {
    runner: Arc<dyn CommandRunner>,
    tools: Arc<Tools>,
}

impl SystemService {
    pub fn new(runner: Arc<dyn CommandRunner>, tools: Arc<Tools>) -> Self {
        Self { runner, tools }
    }

    /// Issues a privileged reboot. On success the process is usually killed
    /// before the response is flushed.
    pub async fn reboot(&self) -> RebootResult {
        log::warn!("[System] Reboot requested");
        let invocation = self.tools.privileged(Tool::Reboot);
        let report = CommandReport::from_result(&self.runner.run(&invocation).await);
        if !report.ok {
            log::error!("[System] Reboot failed: {}", report.text());
        }
        RebootResult {
            ok: report.ok,
            code: report.code,
        }
    }
}

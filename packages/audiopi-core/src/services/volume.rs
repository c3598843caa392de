//! Volume service: reads and sets the output mixer through the configured
//! [`VolumeCurve`].
//!
//! Used by both the aggregate state handler and the volume endpoint.

use std::sync::Arc;

use serde::Serialize;

use crate::audio::amixer::parse_reading;
use crate::audio::{MixerLocator, VolumeCurve};
use crate::exec::{CommandReport, CommandRunner, Tool, Tools};

/// Result of a volume change.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeChange {
    /// Whether the mixer command exited successfully.
    pub ok: bool,
    /// UI volume the hardware level corresponds to.
    pub volume: u8,
    pub detail: CommandReport,
}

pub struct VolumeService {
    runner: Arc<dyn CommandRunner>,
    tools: Arc<Tools>,
    mixer: Arc<MixerLocator>,
    curve: Arc<dyn VolumeCurve>,
}

impl VolumeService {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        tools: Arc<Tools>,
        mixer: Arc<MixerLocator>,
        curve: Arc<dyn VolumeCurve>,
    ) -> Self {
        Self {
            runner,
            tools,
            mixer,
            curve,
        }
    }

    pub fn strategy(&self) -> &'static str {
        self.curve.name()
    }

    pub fn mixer(&self) -> &Arc<MixerLocator> {
        &self.mixer
    }

    /// Current UI volume (0-100). Unreadable mixers report 0.
    pub async fn get_volume(&self) -> u8 {
        let selection = self.mixer.locate().await;
        let invocation = self.tools.command(Tool::Amixer).args([
            "-c".to_string(),
            selection.card.to_string(),
            "get".to_string(),
            selection.control.clone(),
        ]);

        match self.runner.run(&invocation).await {
            Ok(output) if output.success() => {
                let reading = parse_reading(&output.stdout);
                self.curve.from_reading(&reading)
            }
            Ok(output) => {
                log::warn!("[Volume] Reading mixer failed: {}", output.text());
                0
            }
            Err(e) => {
                log::warn!("[Volume] Reading mixer failed: {}", e);
                0
            }
        }
    }

    /// Sets the UI volume. Out-of-range values are clamped to 0-100; 0 mutes.
    pub async fn set_volume(&self, value: i64) -> VolumeChange {
        let ui = value.clamp(0, 100) as u8;
        let selection = self.mixer.locate().await;
        let level = self.curve.to_hardware(ui);

        let invocation = self
            .tools
            .privileged(Tool::Amixer)
            .args([
                "-c".to_string(),
                selection.card.to_string(),
                "set".to_string(),
                selection.control.clone(),
            ])
            .args(self.curve.amixer_args(level));

        let detail = CommandReport::from_result(&self.runner.run(&invocation).await);
        if detail.ok {
            log::info!("[Volume] Set {} ({:?})", ui, level);
        } else {
            log::warn!("[Volume] Setting {} failed: {}", ui, detail.text());
        }

        VolumeChange {
            ok: detail.ok,
            volume: self.curve.from_hardware(level),
            detail,
        }
    }
}

//! Mixer discovery: which card and simple control drive the analog output.
//!
//! Cards matching a preferred identifier are searched before all others, and
//! for each card the control preference list is tried in order. The card is
//! the outer loop, so a generic control on the headphone card wins over an
//! exact control name on an HDMI or USB card.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;

use super::amixer::{parse_cards, parse_simple_controls, SoundCard};
use crate::exec::{CommandRunner, Tool, Tools};
use crate::state::MixerConfig;

/// How a [`MixerSelection`] was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    /// Pinned in configuration.
    Configured,
    /// Found by probing cards and controls.
    Discovered,
    /// Nothing matched; card 0 with the default control.
    Fallback,
}

/// The card/control pair volume commands are addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MixerSelection {
    pub card: u32,
    pub control: String,
    pub source: SelectionSource,
}

/// Orders cards so preferred ones come first, keeping listing order within
/// each group.
pub fn order_cards(cards: Vec<SoundCard>, preferred: &[String]) -> Vec<SoundCard> {
    let (mut first, rest): (Vec<_>, Vec<_>) =
        cards.into_iter().partition(|c| c.matches_any(preferred));
    first.extend(rest);
    first
}

/// Returns the first preferred control present in `available`, using the
/// name exactly as the card reports it.
pub fn pick_control(available: &[String], preferences: &[String]) -> Option<String> {
    preferences.iter().find_map(|wanted| {
        available
            .iter()
            .find(|name| name.eq_ignore_ascii_case(wanted))
            .cloned()
    })
}

/// Locates the output mixer once and remembers it for the process lifetime.
pub struct MixerLocator {
    runner: Arc<dyn CommandRunner>,
    tools: Arc<Tools>,
    config: MixerConfig,
    selection: OnceCell<MixerSelection>,
}

impl MixerLocator {
    pub fn new(runner: Arc<dyn CommandRunner>, tools: Arc<Tools>, config: MixerConfig) -> Self {
        Self {
            runner,
            tools,
            config,
            selection: OnceCell::new(),
        }
    }

    /// Returns the mixer selection, discovering it on first use.
    ///
    /// Never fails: command errors degrade to card 0 and the default control.
    /// A fallback reached because a tool failed to run is not remembered, so
    /// the next call probes again.
    pub async fn locate(&self) -> MixerSelection {
        match self.selection.get_or_try_init(|| self.discover()).await {
            Ok(selection) => selection.clone(),
            Err(transient) => transient,
        }
    }

    /// The selection if it has already been computed.
    pub fn cached(&self) -> Option<&MixerSelection> {
        self.selection.get()
    }

    /// `Err` carries a fallback that must not be cached.
    async fn discover(&self) -> Result<MixerSelection, MixerSelection> {
        if let (Some(card), Some(control)) = (self.config.card, self.config.control.as_ref()) {
            log::info!("[Mixer] Using configured card {} control '{}'", card, control);
            return Ok(MixerSelection {
                card,
                control: control.clone(),
                source: SelectionSource::Configured,
            });
        }

        let mut tool_failed = false;
        let mut cards = self.list_cards(&mut tool_failed).await;
        if cards.is_empty() {
            log::warn!("[Mixer] No sound cards listed, probing card 0");
            cards.push(SoundCard::fallback());
        }

        for card in order_cards(cards, &self.config.preferred_cards) {
            let controls = self.list_controls(card.index, &mut tool_failed).await;
            if let Some(control) = pick_control(&controls, &self.config.controls) {
                log::info!(
                    "[Mixer] Selected card {} ({}) control '{}'",
                    card.index,
                    card.name,
                    control
                );
                return Ok(MixerSelection {
                    card: card.index,
                    control,
                    source: SelectionSource::Discovered,
                });
            }
            log::debug!(
                "[Mixer] Card {} has no preferred control among {:?}",
                card.index,
                controls
            );
        }

        log::warn!(
            "[Mixer] No matching control found, falling back to card 0 '{}'",
            self.config.default_control
        );
        let fallback = MixerSelection {
            card: 0,
            control: self.config.default_control.clone(),
            source: SelectionSource::Fallback,
        };
        if tool_failed {
            Err(fallback)
        } else {
            Ok(fallback)
        }
    }

    /// Sets `tool_failed` when the command could not run at all.
    async fn list_cards(&self, tool_failed: &mut bool) -> Vec<SoundCard> {
        let invocation = self.tools.command(Tool::Aplay).arg("-l");
        match self.runner.run(&invocation).await {
            Ok(output) if output.success() => parse_cards(&output.stdout),
            Ok(output) => {
                log::warn!("[Mixer] Card listing failed: {}", output.text());
                Vec::new()
            }
            Err(e) => {
                log::warn!("[Mixer] Card listing failed: {}", e);
                *tool_failed = true;
                Vec::new()
            }
        }
    }

    async fn list_controls(&self, card: u32, tool_failed: &mut bool) -> Vec<String> {
        let invocation = self
            .tools
            .command(Tool::Amixer)
            .args(["-c".to_string(), card.to_string(), "scontrols".to_string()]);
        match self.runner.run(&invocation).await {
            Ok(output) if output.success() => parse_simple_controls(&output.stdout),
            Ok(_) => Vec::new(),
            Err(e) => {
                log::debug!("[Mixer] Control listing for card {} failed: {}", card, e);
                *tool_failed = true;
                Vec::new()
            }
        }
    }
}

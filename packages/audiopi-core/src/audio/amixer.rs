//! Parsers for ALSA tool output (`aplay -l`, `amixer scontrols`, `amixer get`).
//!
//! All parsers are lenient: unrecognised lines are skipped and missing values
//! come back as `None` rather than errors.

use serde::Serialize;

/// A sound card as listed by `aplay -l`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoundCard {
    pub index: u32,
    /// Short card id, e.g. `Headphones`.
    pub id: String,
    /// Long card name, e.g. `bcm2835 Headphones`.
    pub name: String,
}

impl SoundCard {
    /// Placeholder used when enumeration yields nothing.
    pub fn fallback() -> Self {
        Self {
            index: 0,
            id: String::new(),
            name: String::new(),
        }
    }

    /// Case-insensitive match of any identifier against id or name.
    pub fn matches_any(&self, identifiers: &[String]) -> bool {
        let id = self.id.to_ascii_lowercase();
        let name = self.name.to_ascii_lowercase();
        identifiers.iter().any(|ident| {
            let ident = ident.to_ascii_lowercase();
            !ident.is_empty() && (id.contains(&ident) || name.contains(&ident))
        })
    }
}

/// Parses `aplay -l` output into distinct cards, in listing order.
///
/// ```text
/// card 0: Headphones [bcm2835 Headphones], device 0: bcm2835 Headphones [bcm2835 Headphones]
/// ```
pub fn parse_cards(output: &str) -> Vec<SoundCard> {
    let mut cards: Vec<SoundCard> = Vec::new();

    for line in output.lines() {
        let Some(rest) = line.trim_start().strip_prefix("card ") else {
            continue;
        };
        let Some((index, rest)) = rest.split_once(':') else {
            continue;
        };
        let Ok(index) = index.trim().parse::<u32>() else {
            continue;
        };
        if cards.iter().any(|c| c.index == index) {
            continue;
        }

        // "Headphones [bcm2835 Headphones], device 0: ..."
        let head = rest.split(", device").next().unwrap_or(rest).trim();
        let (id, name) = match head.split_once('[') {
            Some((id, name)) => (id.trim(), name.trim_end_matches(']').trim()),
            None => (head, ""),
        };

        cards.push(SoundCard {
            index,
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    cards
}

/// Parses `amixer scontrols` output into control names.
///
/// ```text
/// Simple mixer control 'PCM',0
/// ```
pub fn parse_simple_controls(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Simple mixer control ")?;
            let rest = rest.strip_prefix('\'')?;
            let end = rest.rfind('\'')?;
            Some(rest[..end].to_string())
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Current state of a mixer control from `amixer get`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixerReading {
    /// Percent of the raw control range, e.g. `[77%]`.
    pub percent: Option<u8>,
    /// Level in millibels (0.01 dB), e.g. `[-20.00dB]` is `-2000`.
    pub millibel: Option<i32>,
    /// Playback switch, `[on]` / `[off]`. `None` if the control has no switch.
    pub switch_on: Option<bool>,
}

impl MixerReading {
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.switch_on == Some(false)
    }
}

/// Parses the first channel line of `amixer get` output.
///
/// ```text
/// Simple mixer control 'PCM',0
///   Capabilities: pvolume pvolume-joined pswitch pswitch-joined
///   Playback channels: Mono
///   Limits: Playback -10239 - 400
///   Mono: Playback -2000 [77%] [-20.00dB] [on]
/// ```
pub fn parse_reading(output: &str) -> MixerReading {
    for line in output.lines() {
        let line = line.trim();
        if !line.contains('[') || line.starts_with("Simple mixer control") {
            continue;
        }

        let mut reading = MixerReading::default();
        for token in bracketed(line) {
            if let Some(pct) = token.strip_suffix('%') {
                if reading.percent.is_none() {
                    reading.percent = pct.trim().parse::<u8>().ok().map(|p| p.min(100));
                }
            } else if let Some(db) = token.strip_suffix("dB") {
                if reading.millibel.is_none() {
                    reading.millibel = db
                        .trim()
                        .parse::<f64>()
                        .ok()
                        .map(|db| (db * 100.0).round() as i32);
                }
            } else if token == "on" {
                reading.switch_on.get_or_insert(true);
            } else if token == "off" {
                reading.switch_on.get_or_insert(false);
            }
        }

        if reading != MixerReading::default() {
            return reading;
        }
    }

    MixerReading::default()
}

/// Yields the contents of each `[...]` group in a line.
fn bracketed(line: &str) -> impl Iterator<Item = &str> {
    line.split('[')
        .skip(1)
        .filter_map(|part| part.split_once(']').map(|(inner, _)| inner))
}

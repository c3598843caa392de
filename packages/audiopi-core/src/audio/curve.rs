//! Volume curves: mapping between the 0-100 UI scale and the mixer's
//! hardware domain.
//!
//! The quiet end of a linear fader is barely audible, so neither curve is a
//! straight copy of the UI value:
//!
//! - [`PercentCurve`] compresses the UI range into the audible top slice of
//!   the hardware percent scale.
//! - [`DecibelCurve`] interpolates in decibels over a fixed nominal range,
//!   after a gamma correction that gives finer steps at low volume. With
//!   `gamma = 1.0` it is plain linear-dB interpolation.
//!
//! UI 0 is always a mute instruction, never the lowest audible level.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::amixer::MixerReading;

/// A hardware level to apply to a mixer control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwLevel {
    /// Switch the control off.
    Mute,
    /// Percent of the raw control range (0-100).
    Percent(u8),
    /// Level in millibels (0.01 dB).
    Millibel(i32),
}

impl HwLevel {
    /// `amixer set` value arguments for this level.
    #[must_use]
    pub fn amixer_args(self) -> Vec<String> {
        match self {
            Self::Mute => vec!["mute".into()],
            Self::Percent(p) => vec![format!("{}%", p.min(100)), "unmute".into()],
            Self::Millibel(mb) => vec![format!("{:.2}dB", f64::from(mb) / 100.0), "unmute".into()],
        }
    }
}

/// Bidirectional mapping between UI volume and [`HwLevel`].
///
/// Implementations clamp every input, map UI 0 to [`HwLevel::Mute`], and
/// keep both directions monotonic non-decreasing with exact round-trips at
/// 0 and 100.
pub trait VolumeCurve: Send + Sync + fmt::Debug {
    /// Short strategy name reported by the API.
    fn name(&self) -> &'static str;

    fn to_hardware(&self, ui: u8) -> HwLevel;

    fn from_hardware(&self, level: HwLevel) -> u8;

    /// Converts a parsed `amixer get` reading to UI volume (0 if muted or
    /// unreadable).
    fn from_reading(&self, reading: &MixerReading) -> u8;

    /// `amixer set` value arguments for a level produced by this curve.
    fn amixer_args(&self, level: HwLevel) -> Vec<String> {
        level.amixer_args()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Percent strategy
// ─────────────────────────────────────────────────────────────────────────────

/// Spreads the UI range over `[lo, hi]` percent of the hardware scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentCurve {
    lo: u8,
    hi: u8,
}

impl PercentCurve {
    /// Creates a curve over `[lo, hi]`. Values are clamped so that
    /// `lo < hi <= 100`.
    #[must_use]
    pub fn new(lo: u8, hi: u8) -> Self {
        let hi = hi.clamp(1, 100);
        let lo = lo.min(hi - 1);
        Self { lo, hi }
    }

    fn span(&self) -> f64 {
        f64::from(self.hi - self.lo)
    }
}

impl VolumeCurve for PercentCurve {
    fn name(&self) -> &'static str {
        "percent"
    }

    fn to_hardware(&self, ui: u8) -> HwLevel {
        let ui = ui.min(100);
        if ui == 0 {
            return HwLevel::Mute;
        }
        let offset = (f64::from(ui) / 100.0 * self.span()).round() as u8;
        // 0% is silent even when unmuted.
        HwLevel::Percent((self.lo + offset).max(1))
    }

    fn from_hardware(&self, level: HwLevel) -> u8 {
        match level {
            HwLevel::Mute | HwLevel::Percent(0) => 0,
            HwLevel::Percent(hw) => {
                let hw = f64::from(hw.min(100));
                let ui = ((hw - f64::from(self.lo)) / self.span() * 100.0).round();
                // Any unmuted level is at least 1 so "muted" and "quietest" differ.
                ui.clamp(1.0, 100.0) as u8
            }
            HwLevel::Millibel(_) => 0,
        }
    }

    fn from_reading(&self, reading: &MixerReading) -> u8 {
        if reading.is_muted() {
            return 0;
        }
        reading
            .percent
            .map(|p| self.from_hardware(HwLevel::Percent(p)))
            .unwrap_or(0)
    }

    fn amixer_args(&self, level: HwLevel) -> Vec<String> {
        match level {
            HwLevel::Mute => vec!["0%".into(), "mute".into()],
            other => other.amixer_args(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decibel strategy
// ─────────────────────────────────────────────────────────────────────────────

/// Gamma-corrected interpolation over a nominal decibel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecibelCurve {
    min_mb: i32,
    max_mb: i32,
    gamma: f64,
}

impl DecibelCurve {
    /// Creates a curve over `[min_db, max_db]`. A non-positive or non-finite
    /// gamma falls back to 1.0 (linear); an inverted range is swapped.
    #[must_use]
    pub fn new(min_db: f64, max_db: f64, gamma: f64) -> Self {
        let (lo, hi) = if min_db <= max_db {
            (min_db, max_db)
        } else {
            (max_db, min_db)
        };
        let min_mb = (lo * 100.0).round() as i32;
        let mut max_mb = (hi * 100.0).round() as i32;
        if max_mb == min_mb {
            max_mb = min_mb + 1;
        }
        let gamma = if gamma.is_finite() && gamma > 0.0 {
            gamma
        } else {
            1.0
        };
        Self {
            min_mb,
            max_mb,
            gamma,
        }
    }

    fn span(&self) -> f64 {
        f64::from(self.max_mb - self.min_mb)
    }
}

impl VolumeCurve for DecibelCurve {
    fn name(&self) -> &'static str {
        "decibel"
    }

    fn to_hardware(&self, ui: u8) -> HwLevel {
        let ui = ui.min(100);
        if ui == 0 {
            return HwLevel::Mute;
        }
        let x = (f64::from(ui) / 100.0).powf(self.gamma);
        let mb = (f64::from(self.min_mb) + x * self.span()).round() as i32;
        HwLevel::Millibel(mb.clamp(self.min_mb, self.max_mb))
    }

    fn from_hardware(&self, level: HwLevel) -> u8 {
        match level {
            HwLevel::Mute => 0,
            HwLevel::Millibel(mb) => {
                let mb = mb.clamp(self.min_mb, self.max_mb);
                let x = f64::from(mb - self.min_mb) / self.span();
                let ui = (x.powf(1.0 / self.gamma) * 100.0).round();
                ui.clamp(1.0, 100.0) as u8
            }
            // Control without dB information: raw percent is the best we have.
            HwLevel::Percent(p) => p.min(100),
        }
    }

    fn from_reading(&self, reading: &MixerReading) -> u8 {
        if reading.is_muted() {
            return 0;
        }
        match (reading.millibel, reading.percent) {
            (Some(mb), _) => self.from_hardware(HwLevel::Millibel(mb)),
            (None, Some(p)) => self.from_hardware(HwLevel::Percent(p)),
            (None, None) => 0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Which curve a deployment uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VolumeStrategy {
    Decibel { min_db: f64, max_db: f64, gamma: f64 },
    Percent { lo_percent: u8, hi_percent: u8 },
}

impl Default for VolumeStrategy {
    /// -50 dB..+4 dB with gamma 0.6, the curve tuned for the on-board
    /// headphone output.
    fn default() -> Self {
        Self::Decibel {
            min_db: -50.0,
            max_db: 4.0,
            gamma: 0.6,
        }
    }
}

impl VolumeStrategy {
    /// Linear-dB variant of the default range.
    #[must_use]
    pub fn linear_decibel() -> Self {
        Self::Decibel {
            min_db: -50.0,
            max_db: 4.0,
            gamma: 1.0,
        }
    }

    /// Percent compression into the top 30 points of the hardware scale.
    #[must_use]
    pub fn compressed_percent() -> Self {
        Self::Percent {
            lo_percent: 70,
            hi_percent: 100,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::Decibel {
                min_db,
                max_db,
                gamma,
            } => {
                if !min_db.is_finite() || !max_db.is_finite() || min_db >= max_db {
                    return Err(format!(
                        "decibel range must satisfy min_db < max_db (got {} .. {})",
                        min_db, max_db
                    ));
                }
                if !gamma.is_finite() || gamma <= 0.0 {
                    return Err(format!("gamma must be > 0 (got {})", gamma));
                }
            }
            Self::Percent {
                lo_percent,
                hi_percent,
            } => {
                if hi_percent > 100 || lo_percent >= hi_percent {
                    return Err(format!(
                        "percent range must satisfy lo < hi <= 100 (got {} .. {})",
                        lo_percent, hi_percent
                    ));
                }
            }
        }
        Ok(())
    }

    /// Builds the curve for this strategy.
    #[must_use]
    pub fn build(&self) -> Arc<dyn VolumeCurve> {
        match *self {
            Self::Decibel {
                min_db,
                max_db,
                gamma,
            } => Arc::new(DecibelCurve::new(min_db, max_db, gamma)),
            Self::Percent {
                lo_percent,
                hi_percent,
            } => Arc::new(PercentCurve::new(lo_percent, hi_percent)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curves() -> Vec<(Arc<dyn VolumeCurve>, u8)> {
        vec![
            (VolumeStrategy::default().build(), 1),
            (VolumeStrategy::linear_decibel().build(), 1),
            (VolumeStrategy::compressed_percent().build(), 2),
        ]
    }

    /// Orders levels for monotonicity checks: mute below everything.
    fn rank(level: HwLevel) -> i64 {
        match level {
            HwLevel::Mute => i64::MIN,
            HwLevel::Percent(p) => i64::from(p),
            HwLevel::Millibel(mb) => i64::from(mb),
        }
    }

    #[test]
    fn zero_is_always_mute() {
        for (curve, _) in curves() {
            assert_eq!(curve.to_hardware(0), HwLevel::Mute, "{}", curve.name());
            assert!(curve.amixer_args(HwLevel::Mute).contains(&"mute".to_string()));
        }
    }

    #[test]
    fn extremes_round_trip_exactly() {
        for (curve, _) in curves() {
            assert_eq!(curve.from_hardware(curve.to_hardware(0)), 0);
            assert_eq!(curve.from_hardware(curve.to_hardware(100)), 100);
        }
    }

    #[test]
    fn round_trip_within_tolerance() {
        for (curve, tolerance) in curves() {
            for ui in 0..=100u8 {
                let back = curve.from_hardware(curve.to_hardware(ui));
                assert!(
                    back.abs_diff(ui) <= tolerance,
                    "{}: {} -> {:?} -> {}",
                    curve.name(),
                    ui,
                    curve.to_hardware(ui),
                    back
                );
            }
        }
    }

    #[test]
    fn to_hardware_is_monotonic() {
        for (curve, _) in curves() {
            let ranks: Vec<_> = (0..=100u8).map(|ui| rank(curve.to_hardware(ui))).collect();
            assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "{}", curve.name());
        }
    }

    #[test]
    fn from_hardware_is_monotonic() {
        let db = DecibelCurve::new(-50.0, 4.0, 0.6);
        let values: Vec<_> = (-6000..=600)
            .step_by(7)
            .map(|mb| db.from_hardware(HwLevel::Millibel(mb)))
            .collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));

        let pct = PercentCurve::new(70, 100);
        let values: Vec<_> = (0..=100u8)
            .map(|p| pct.from_hardware(HwLevel::Percent(p)))
            .collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn inputs_above_range_are_clamped() {
        for (curve, _) in curves() {
            assert_eq!(curve.to_hardware(250), curve.to_hardware(100));
        }
    }

    #[test]
    fn percent_curve_maps_into_top_range() {
        let curve = PercentCurve::new(70, 100);
        assert_eq!(curve.to_hardware(100), HwLevel::Percent(100));
        assert_eq!(curve.to_hardware(50), HwLevel::Percent(85));
        assert_eq!(curve.to_hardware(1), HwLevel::Percent(70));
    }

    #[test]
    fn percent_curve_quiet_but_unmuted_reads_as_one() {
        let curve = PercentCurve::new(70, 100);
        assert_eq!(curve.from_hardware(HwLevel::Percent(0)), 0);
        assert_eq!(curve.from_hardware(HwLevel::Percent(5)), 1);
        assert_eq!(curve.from_hardware(HwLevel::Percent(70)), 1);
    }

    #[test]
    fn percent_curve_from_zero_never_unmutes_at_zero() {
        let curve = PercentCurve::new(0, 30);
        assert_eq!(curve.to_hardware(1), HwLevel::Percent(1));
        assert_eq!(curve.from_hardware(curve.to_hardware(1)), 3);
        assert!((1..=100u8).all(|ui| curve.to_hardware(ui) != HwLevel::Percent(0)));
    }

    #[test]
    fn percent_curve_mute_args_zero_the_fader() {
        let curve = PercentCurve::new(70, 100);
        assert_eq!(curve.amixer_args(HwLevel::Mute), vec!["0%", "mute"]);
        assert_eq!(
            curve.amixer_args(HwLevel::Percent(85)),
            vec!["85%", "unmute"]
        );
    }

    #[test]
    fn decibel_curve_top_is_max_db() {
        let curve = DecibelCurve::new(-50.0, 4.0, 0.6);
        assert_eq!(curve.to_hardware(100), HwLevel::Millibel(400));
        assert_eq!(
            curve.amixer_args(HwLevel::Millibel(400)),
            vec!["4.00dB", "unmute"]
        );
        assert_eq!(
            curve.amixer_args(HwLevel::Millibel(-4659)),
            vec!["-46.59dB", "unmute"]
        );
    }

    #[test]
    fn gamma_gives_low_end_more_resolution() {
        let gamma = DecibelCurve::new(-50.0, 4.0, 0.6);
        let linear = DecibelCurve::new(-50.0, 4.0, 1.0);
        // A low UI setting sits higher in dB under the gamma curve.
        assert!(rank(gamma.to_hardware(10)) > rank(linear.to_hardware(10)));
        assert_eq!(linear.to_hardware(50), HwLevel::Millibel(-2300));
    }

    #[test]
    fn decibel_reading_below_floor_is_quietest_not_muted() {
        let curve = DecibelCurve::new(-50.0, 4.0, 0.6);
        let reading = MixerReading {
            percent: Some(10),
            millibel: Some(-9000),
            switch_on: Some(true),
        };
        assert_eq!(curve.from_reading(&reading), 1);
    }

    #[test]
    fn muted_reading_is_zero() {
        let reading = MixerReading {
            percent: Some(77),
            millibel: Some(-2000),
            switch_on: Some(false),
        };
        for (curve, _) in curves() {
            assert_eq!(curve.from_reading(&reading), 0);
        }
    }

    #[test]
    fn decibel_reading_without_db_uses_raw_percent() {
        let curve = DecibelCurve::new(-50.0, 4.0, 0.6);
        let reading = MixerReading {
            percent: Some(42),
            millibel: None,
            switch_on: None,
        };
        assert_eq!(curve.from_reading(&reading), 42);
        assert_eq!(curve.from_reading(&MixerReading::default()), 0);
    }

    #[test]
    fn strategy_validation() {
        assert!(VolumeStrategy::default().validate().is_ok());
        assert!(VolumeStrategy::compressed_percent().validate().is_ok());
        assert!(VolumeStrategy::Decibel {
            min_db: 4.0,
            max_db: -50.0,
            gamma: 0.6
        }
        .validate()
        .is_err());
        assert!(VolumeStrategy::Decibel {
            min_db: -50.0,
            max_db: 4.0,
            gamma: 0.0
        }
        .validate()
        .is_err());
        assert!(VolumeStrategy::Percent {
            lo_percent: 90,
            hi_percent: 80
        }
        .validate()
        .is_err());
    }

    #[test]
    fn strategy_deserializes_from_tagged_json() {
        let strategy: VolumeStrategy =
            serde_json::from_str(r#"{"kind":"percent","lo_percent":60,"hi_percent":100}"#)
                .unwrap();
        assert_eq!(strategy.build().name(), "percent");
    }
}

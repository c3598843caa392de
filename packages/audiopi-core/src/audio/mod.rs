//! ALSA mixer control: discovery, output parsing, and volume curves.

pub mod amixer;
pub mod curve;
pub mod mixer;

pub use amixer::{MixerReading, SoundCard};
pub use curve::{DecibelCurve, HwLevel, PercentCurve, VolumeCurve, VolumeStrategy};
pub use mixer::{MixerLocator, MixerSelection, SelectionSource};

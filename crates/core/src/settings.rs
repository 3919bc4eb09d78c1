//! Per-request synthesis engine parameters

use serde::{Deserialize, Serialize};

fn default_noise_scale() -> f64 {
    0.667
}

fn default_length_scale() -> f64 {
    1.0
}

fn default_noise_w() -> f64 {
    0.8
}

/// Numeric parameters handed to the synthesis engine for every utterance in a
/// request. Pure value object; out-of-range values are clamped to the ranges
/// the engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisSettings {
    /// Speaker index for multi-speaker models
    #[serde(default)]
    pub speaker: u32,
    /// Generator noise scale
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f64,
    /// Phoneme length scale (speech rate; higher is slower)
    #[serde(default = "default_length_scale")]
    pub length_scale: f64,
    /// Phoneme width noise weight
    #[serde(default = "default_noise_w")]
    pub noise_w: f64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            speaker: 0,
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
            noise_w: default_noise_w(),
        }
    }
}

impl SynthesisSettings {
    /// Clamp all fields into the ranges the engine accepts.
    pub fn clamped(self) -> Self {
        Self {
            speaker: self.speaker,
            noise_scale: self.noise_scale.clamp(0.0, 2.0),
            length_scale: self.length_scale.clamp(0.1, 4.0),
            noise_w: self.noise_w.clamp(0.0, 2.0),
        }
    }
}

//! Shared domain types for the habla text-to-speech pipeline
//!
//! This crate holds the value types that cross crate boundaries:
//! - `VoiceProfile`: a synthesis model with its metadata and text rules
//! - `SynthesisSettings`: per-request numeric engine parameters
//! - `ConversionRequest`: one text-to-audio conversion call

mod settings;
mod voice;

pub use settings::SynthesisSettings;
pub use voice::{ReplacementRule, VoiceProfile};

/// A single text-to-audio conversion call.
///
/// Created per API call; nothing about it persists beyond the call.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Raw input text, possibly containing `<#...#>` directives
    pub text: String,
    /// Id or alias of the voice used until a voice-switch directive fires
    pub default_voice: String,
    /// Engine parameters for every utterance in this request
    pub settings: SynthesisSettings,
}

impl ConversionRequest {
    /// Create a request with default synthesis settings.
    pub fn new(text: impl Into<String>, default_voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            default_voice: default_voice.into(),
            settings: SynthesisSettings::default(),
        }
    }
}

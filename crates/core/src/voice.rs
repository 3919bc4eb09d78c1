//! Voice profile types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An ordered find/replace rule applied to text before synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRule {
    /// Token or phrase to match (whole-word, case-insensitive)
    pub find: String,
    /// Spoken form substituted on match
    pub replace: String,
}

impl ReplacementRule {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }
}

/// A synthesis model: stable id, display metadata, weights location, and the
/// text-replacement rules specific to this voice.
///
/// Profiles are built once at catalog load and are immutable afterwards. A
/// profile is usable only while its weights file is present on disk.
#[derive(Debug, Clone)]
pub struct VoiceProfile {
    /// Stable id from the model card (e.g. `es_MX-lilith`)
    pub id: String,
    /// Filename-derived key (e.g. `es_MX-lilith-9494`), also a valid alias
    pub key: String,
    /// Human-readable name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Language tag (e.g. `es_MX`)
    pub language: String,
    /// Path to the model weights (`.onnx`)
    pub weights_path: PathBuf,
    /// Voice-specific replacement rules; empty means "use the global rules"
    pub replacements: Vec<ReplacementRule>,
}

impl VoiceProfile {
    /// Whether the weights file backing this voice is present on disk.
    pub fn is_usable(&self) -> bool {
        self.weights_path.is_file()
    }

    /// Weights path as a `Path`.
    pub fn weights(&self) -> &Path {
        &self.weights_path
    }
}

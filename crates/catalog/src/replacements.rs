//! Global replacement provider
//!
//! `global_replacements.json` holds the fallback replacement rules used when
//! the active voice defines none:
//!
//! ```json
//! { "global_replacements": [["Dr.", "Doctor"], ["km", "kilómetros"]] }
//! ```
//!
//! A missing or unparseable file yields an empty list; it is logged, never
//! fatal.

use std::fs;
use std::path::Path;

use habla_core::ReplacementRule;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct GlobalReplacementsFile {
    #[serde(default)]
    global_replacements: Vec<(String, String)>,
}

/// Load the ordered global replacement list from `path`.
pub fn load_global_replacements(path: &Path) -> Vec<ReplacementRule> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "no global replacements loaded");
            return Vec::new();
        }
    };

    match serde_json::from_str::<GlobalReplacementsFile>(&raw) {
        Ok(file) => {
            let rules: Vec<ReplacementRule> = file
                .global_replacements
                .into_iter()
                .map(|(find, replace)| ReplacementRule::new(find, replace))
                .collect();
            tracing::info!(count = rules.len(), "loaded global replacements");
            rules
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "bad global replacements file");
            Vec::new()
        }
    }
}

//! Model directory scanning
//!
//! Each voice ships as a pair of files:
//! - `<key>.onnx` — the model weights
//! - `<key>.onnx.json` — metadata sidecar with a `modelcard` object
//!
//! A sidecar without its weights file is logged and skipped; a sidecar that
//! fails to parse is logged and skipped. Neither aborts the scan.

use std::fs;
use std::path::Path;

use habla_core::{ReplacementRule, VoiceProfile};
use serde::Deserialize;

use crate::{CatalogError, VoiceCatalog};

const SIDECAR_SUFFIX: &str = ".onnx.json";

#[derive(Debug, Deserialize)]
struct Sidecar {
    #[serde(default)]
    modelcard: ModelCard,
}

#[derive(Debug, Default, Deserialize)]
struct ModelCard {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    language: Option<String>,
    /// Ordered `[find, replace]` pairs
    #[serde(default)]
    replacements: Option<Vec<(String, String)>>,
}

/// Scan `model_dir` and build a catalog snapshot from every usable voice.
pub fn load_catalog(model_dir: &Path) -> Result<VoiceCatalog, CatalogError> {
    let entries = fs::read_dir(model_dir)
        .map_err(|e| CatalogError::ModelDir(model_dir.to_path_buf(), e))?;

    let mut profiles = Vec::new();
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(key) = name.strip_suffix(SIDECAR_SUFFIX) else {
            continue;
        };

        let weights_path = model_dir.join(format!("{key}.onnx"));
        if !weights_path.is_file() {
            tracing::warn!(voice = key, "skipping voice: weights file missing");
            continue;
        }

        let sidecar: Sidecar = match fs::read_to_string(entry.path())
            .map_err(CatalogError::Io)
            .and_then(|s| serde_json::from_str(&s).map_err(|e| parse_error(key, e)))
        {
            Ok(sidecar) => sidecar,
            Err(e) => {
                tracing::error!(voice = key, error = %e, "skipping voice: bad metadata");
                continue;
            }
        };

        let card = sidecar.modelcard;
        let id = card.id.unwrap_or_else(|| key.to_string());
        let replacements = card
            .replacements
            .unwrap_or_default()
            .into_iter()
            .map(|(find, replace)| ReplacementRule::new(find, replace))
            .collect();

        let profile = VoiceProfile {
            name: card.name.clone().unwrap_or_else(|| id.clone()),
            description: card.description.unwrap_or_else(|| id.clone()),
            language: card.language.unwrap_or_else(|| "unknown".to_string()),
            id: id.clone(),
            key: key.to_string(),
            weights_path,
            replacements,
        };

        tracing::info!(voice = key, id = %id, name = %profile.name, "loaded voice");
        profiles.push(profile);
    }

    Ok(VoiceCatalog::from_profiles(profiles))
}

fn parse_error(key: &str, e: serde_json::Error) -> CatalogError {
    CatalogError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("{key}{SIDECAR_SUFFIX}: {e}"),
    ))
}

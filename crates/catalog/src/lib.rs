//! Voice catalog and global replacement providers
//!
//! Scans a model directory for `<key>.onnx.json` metadata sidecars and builds
//! an immutable [`VoiceCatalog`] snapshot: a mapping from voice id *and*
//! filename key to a [`VoiceProfile`]. Profiles whose `.onnx` weights file is
//! missing are skipped at load time.
//!
//! The snapshot is rebuildable: [`CatalogHandle::reload`] runs the same scan
//! and atomically swaps the new snapshot in. Readers hold cheap `Arc` clones
//! and are never blocked by a reload.

mod loader;
mod replacements;

pub use loader::load_catalog;
pub use replacements::load_global_replacements;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use habla_core::VoiceProfile;
use parking_lot::RwLock;

/// Errors raised while building a catalog snapshot.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("model directory {0} is not readable: {1}")]
    ModelDir(PathBuf, std::io::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Immutable snapshot of the voices available to the pipeline.
///
/// Safe for unsynchronized concurrent reads; never mutated after construction.
#[derive(Debug, Default)]
pub struct VoiceCatalog {
    profiles: Vec<Arc<VoiceProfile>>,
    // Both the modelcard id and the filename key resolve to the same profile.
    by_alias: HashMap<String, usize>,
}

impl VoiceCatalog {
    pub(crate) fn from_profiles(profiles: Vec<VoiceProfile>) -> Self {
        let profiles: Vec<Arc<VoiceProfile>> = profiles.into_iter().map(Arc::new).collect();
        let mut by_alias = HashMap::new();
        for (idx, profile) in profiles.iter().enumerate() {
            by_alias.insert(profile.key.clone(), idx);
            by_alias.entry(profile.id.clone()).or_insert(idx);
        }
        Self { profiles, by_alias }
    }

    /// Look a voice up by id or filename key.
    pub fn resolve(&self, id_or_alias: &str) -> Option<Arc<VoiceProfile>> {
        self.by_alias
            .get(id_or_alias)
            .map(|&idx| Arc::clone(&self.profiles[idx]))
    }

    /// All loaded profiles, in scan order.
    pub fn profiles(&self) -> impl Iterator<Item = &Arc<VoiceProfile>> {
        self.profiles.iter()
    }

    /// Number of distinct voices loaded.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Shared handle over the current catalog snapshot.
///
/// Rebuilding re-runs the model directory scan and swaps the snapshot in one
/// store; in-flight conversions keep the snapshot they started with.
pub struct CatalogHandle {
    model_dir: PathBuf,
    current: RwLock<Arc<VoiceCatalog>>,
}

impl CatalogHandle {
    /// Scan `model_dir` and build the initial snapshot.
    pub fn new(model_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let model_dir = model_dir.into();
        let catalog = load_catalog(&model_dir)?;
        Ok(Self {
            model_dir,
            current: RwLock::new(Arc::new(catalog)),
        })
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<VoiceCatalog> {
        Arc::clone(&self.current.read())
    }

    /// Re-scan the model directory and swap the snapshot atomically.
    pub fn reload(&self) -> Result<(), CatalogError> {
        let catalog = load_catalog(&self.model_dir)?;
        tracing::info!(voices = catalog.len(), "voice catalog reloaded");
        *self.current.write() = Arc::new(catalog);
        Ok(())
    }

    /// Directory this handle scans.
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_voice(dir: &Path, key: &str, id: &str) {
        File::create(dir.join(format!("{key}.onnx"))).unwrap();
        let mut f = File::create(dir.join(format!("{key}.onnx.json"))).unwrap();
        write!(f, "{{\"modelcard\": {{\"id\": \"{id}\"}}}}").unwrap();
    }

    fn remove_voice(dir: &Path, key: &str) {
        std::fs::remove_file(dir.join(format!("{key}.onnx"))).unwrap();
        std::fs::remove_file(dir.join(format!("{key}.onnx.json"))).unwrap();
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_voice(dir.path(), "es_MX-lilith-9494", "es_MX-lilith");

        let handle = CatalogHandle::new(dir.path()).unwrap();
        assert!(handle.snapshot().resolve("es_MX-lilith").is_some());

        write_voice(dir.path(), "es_ES-marta-1234", "es_ES-marta");
        remove_voice(dir.path(), "es_MX-lilith-9494");
        handle.reload().unwrap();

        let after = handle.snapshot();
        assert!(after.resolve("es_ES-marta").is_some());
        assert!(after.resolve("es_MX-lilith").is_none());
    }

    #[test]
    fn test_reload_does_not_disturb_held_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        write_voice(dir.path(), "es_MX-lilith-9494", "es_MX-lilith");

        let handle = CatalogHandle::new(dir.path()).unwrap();
        let held = handle.snapshot();

        remove_voice(dir.path(), "es_MX-lilith-9494");
        write_voice(dir.path(), "es_ES-marta-1234", "es_ES-marta");
        handle.reload().unwrap();

        // A conversion that started before the reload keeps the voices it
        // resolved against.
        assert!(held.resolve("es_MX-lilith").is_some());
        assert!(held.resolve("es_ES-marta").is_none());
        assert_eq!(handle.snapshot().len(), 1);
    }
}

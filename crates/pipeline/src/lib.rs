//! Text-to-speech conversion pipeline
//!
//! Turns free-form text (with optional inline `<#...#>` directives) into one
//! compressed audio artifact:
//!
//! 1. [`directive`] splits the input into literal runs and control directives
//!    while tracking the active voice
//! 2. [`normalize`] rewrites each literal run into speakable form
//! 3. [`segment`] splits normalized text into engine-sized utterances
//! 4. [`orchestrate`] synthesizes utterances concurrently on a bounded pool
//!    while silence directives resolve inline, and collects fragments in
//!    document order
//! 5. [`assemble`] concatenates the fragments and compresses the result
//!
//! Synthesis and transcoding are delegated to external child processes behind
//! the [`SynthesisEngine`] and [`AudioTranscoder`] seams.

mod assemble;
mod directive;
mod engine;
mod normalize;
mod orchestrate;
mod retry;
mod segment;
mod transcoder;
mod util;

pub use engine::{EngineFailure, PiperEngine, SynthesisEngine};
pub use retry::{bounded, RetryError, RetryPolicy};
pub use transcoder::{AudioTranscoder, FfmpegTranscoder, TranscoderFailure, CHANNELS, SAMPLE_RATE};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use habla_catalog::CatalogHandle;
use habla_core::{ConversionRequest, ReplacementRule};
use tokio::sync::Semaphore;

/// Fatal conversion errors surfaced to the caller.
///
/// Per-utterance engine failures are not here on purpose: they are retried,
/// logged, and degraded to omission inside the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Requested default voice missing or its weights file is absent
    #[error("voice '{0}' not found or its weights file is missing")]
    Configuration(String),
    /// Concat or compression step failed
    #[error("transcoder failed: {0}")]
    Transcoder(#[from] TranscoderFailure),
    /// Every unit failed or produced nothing usable
    #[error("no audio produced")]
    NoOutput,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Upper bound on synthesis workers regardless of core count.
const MAX_WORKERS: usize = 32;

fn default_workers() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    ((cores as f64 * 1.5).ceil() as usize).min(MAX_WORKERS)
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory per-request temp dirs are created under
    pub work_dir: PathBuf,
    /// Directory final artifacts are written to
    pub output_dir: PathBuf,
    /// Synthesis worker pool size; `None` sizes from available parallelism
    pub workers: Option<usize>,
    /// Retry policy for per-utterance engine calls
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("temp_audio"),
            output_dir: PathBuf::from("temp_audio"),
            workers: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// The conversion pipeline.
///
/// One instance is shared by all concurrent requests; the worker pool it owns
/// is the only cross-request shared mutable resource.
pub struct Pipeline {
    catalog: Arc<CatalogHandle>,
    global_replacements: Arc<Vec<ReplacementRule>>,
    engine: Arc<dyn SynthesisEngine>,
    transcoder: Arc<dyn AudioTranscoder>,
    pool: Arc<Semaphore>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<CatalogHandle>,
        global_replacements: Vec<ReplacementRule>,
        engine: Arc<dyn SynthesisEngine>,
        transcoder: Arc<dyn AudioTranscoder>,
        config: PipelineConfig,
    ) -> Self {
        let workers = config.workers.unwrap_or_else(default_workers);
        tracing::info!(workers, "synthesis worker pool initialized");
        Self {
            catalog,
            global_replacements: Arc::new(global_replacements),
            engine,
            transcoder,
            pool: Arc::new(Semaphore::new(workers)),
            config,
        }
    }

    /// Convert `request.text` into one compressed audio file.
    ///
    /// Returns the artifact path (ownership transfers to the caller) or
    /// exactly one error; a partial file is never returned. Every
    /// intermediate file is deleted before this returns, on all exit paths.
    pub async fn convert(&self, request: &ConversionRequest) -> Result<PathBuf, ConvertError> {
        let catalog = self.catalog.snapshot();
        let default_voice = catalog
            .resolve(&request.default_voice)
            .filter(|v| v.is_usable())
            .ok_or_else(|| ConvertError::Configuration(request.default_voice.clone()))?;
        let settings = request.settings.clamped();

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        // Dropping the TempDir removes every fragment, the concat manifest,
        // and the intermediate waveform on success and failure alike.
        let temp = tempfile::tempdir_in(&self.config.work_dir)?;
        tracing::debug!(dir = %temp.path().display(), "created request temp dir");

        let segments = directive::parse(&request.text, &catalog, &default_voice);

        let fragments = orchestrate::run(
            segments,
            self.global_replacements.as_slice(),
            &self.engine,
            &self.transcoder,
            &self.pool,
            self.config.retry,
            settings,
            temp.path(),
        )
        .await;

        let artifact = assemble::assemble(
            self.transcoder.as_ref(),
            &fragments,
            temp.path(),
            &self.config.output_dir,
        )
        .await?;

        tracing::info!(artifact = %artifact.display(), fragments = fragments.len(), "conversion finished");
        Ok(artifact)
    }

    /// Directory final artifacts are written to.
    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }
}

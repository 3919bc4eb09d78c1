//! Synthesis engine seam and the Piper child-process adapter
//!
//! The engine contract: given model weights and numeric settings, accept one
//! line of text on standard input and write a single audio file to the given
//! path. Exit status 0 plus a non-empty output file is success; anything else
//! is a failure the orchestrator may retry.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use habla_core::{SynthesisSettings, VoiceProfile};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A single failed synthesis attempt.
#[derive(Debug, thiserror::Error)]
pub enum EngineFailure {
    #[error("engine exited with {status}: {stderr}")]
    Process { status: String, stderr: String },
    #[error("engine wrote no usable output to {0}")]
    EmptyOutput(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// External single-utterance speech synthesis.
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    /// Synthesize `text` with `voice` into the file at `out`.
    ///
    /// One attempt; retries and deadlines belong to the caller.
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        settings: &SynthesisSettings,
        out: &Path,
    ) -> Result<(), EngineFailure>;
}

/// Adapter for the Piper binary.
pub struct PiperEngine {
    binary: PathBuf,
}

impl PiperEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        let binary = binary.into();
        if binary.is_file() {
            tracing::info!(binary = %binary.display(), "piper binary found");
        } else {
            tracing::error!(binary = %binary.display(), "piper binary not found");
        }
        Self { binary }
    }
}

#[async_trait]
impl SynthesisEngine for PiperEngine {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        settings: &SynthesisSettings,
        out: &Path,
    ) -> Result<(), EngineFailure> {
        tracing::debug!(voice = %voice.id, chars = text.chars().count(), "synthesizing utterance");

        let mut child = Command::new(&self.binary)
            .arg("-m")
            .arg(voice.weights())
            .arg("-f")
            .arg(out)
            .arg("--speaker")
            .arg(settings.speaker.to_string())
            .arg("--noise-scale")
            .arg(settings.noise_scale.to_string())
            .arg("--length-scale")
            .arg(settings.length_scale.to_string())
            .arg("--noise-w")
            .arg(settings.noise_w.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // The orchestrator drops this future on timeout; take the child
            // process down with it.
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            discard(out).await;
            return Err(EngineFailure::Process {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !is_non_empty_file(out).await {
            discard(out).await;
            return Err(EngineFailure::EmptyOutput(out.to_path_buf()));
        }

        Ok(())
    }
}

/// Whether `path` exists and holds at least one byte.
pub(crate) async fn is_non_empty_file(path: &Path) -> bool {
    matches!(tokio::fs::metadata(path).await, Ok(meta) if meta.len() > 0)
}

/// Remove a stale output file left behind by a failed attempt.
async fn discard(path: &Path) {
    if tokio::fs::remove_file(path).await.is_ok() {
        tracing::debug!(path = %path.display(), "removed stale engine output");
    }
}

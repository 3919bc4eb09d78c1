//! Audio transcoder seam and the ffmpeg adapter
//!
//! Three operations: generating fixed-duration silence, lossless
//! concatenation of ordered clips, and compression to the delivery format.
//! Contract for all three: exit status 0 and a non-empty output file.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::engine::is_non_empty_file;
use crate::util::random_string;

/// Fixed pipeline sample rate (Hz); every fragment is produced at this rate.
pub const SAMPLE_RATE: u32 = 22_050;
/// Fixed pipeline channel count (mono).
pub const CHANNELS: u32 = 1;

/// A failed transcoder invocation. Always fatal to the request.
#[derive(Debug, thiserror::Error)]
pub enum TranscoderFailure {
    #[error("{step} exited with {status}: {stderr}")]
    Process {
        step: &'static str,
        status: String,
        stderr: String,
    },
    #[error("{step} wrote no usable output to {out}")]
    EmptyOutput { step: &'static str, out: PathBuf },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// External audio transcoding operations.
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Write `seconds` of silence (mono, pipeline sample rate) to `out`.
    async fn write_silence(&self, seconds: f64, out: &Path) -> Result<(), TranscoderFailure>;

    /// Losslessly concatenate `inputs`, in order, into `out`.
    async fn concat(&self, inputs: &[PathBuf], out: &Path) -> Result<(), TranscoderFailure>;

    /// Compress the waveform at `input` to the delivery format at `out`.
    async fn compress(&self, input: &Path, out: &Path) -> Result<(), TranscoderFailure>;
}

/// Adapter for the ffmpeg binary.
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run `ffmpeg -version` to confirm the binary is present and executable.
    pub async fn probe(&self) -> bool {
        let ok = Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false);
        if ok {
            tracing::info!(binary = %self.binary.display(), "ffmpeg found and functional");
        } else {
            tracing::error!(binary = %self.binary.display(), "ffmpeg missing or not executable");
        }
        ok
    }

    async fn run(
        &self,
        step: &'static str,
        args: &[&str],
        out: &Path,
    ) -> Result<(), TranscoderFailure> {
        let output = Command::new(&self.binary)
            .args(["-loglevel", "error"])
            .args(args)
            .arg("-y")
            .arg(out)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(TranscoderFailure::Process {
                step,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !is_non_empty_file(out).await {
            return Err(TranscoderFailure::EmptyOutput {
                step,
                out: out.to_path_buf(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    async fn write_silence(&self, seconds: f64, out: &Path) -> Result<(), TranscoderFailure> {
        let source = format!("anullsrc=r={SAMPLE_RATE}:cl=mono");
        let duration = seconds.to_string();
        let rate = SAMPLE_RATE.to_string();
        let channels = CHANNELS.to_string();
        self.run(
            "silence",
            &[
                "-f", "lavfi", "-i", &source, "-t", &duration, "-ar", &rate, "-ac", &channels,
                "-f", "wav",
            ],
            out,
        )
        .await
    }

    async fn concat(&self, inputs: &[PathBuf], out: &Path) -> Result<(), TranscoderFailure> {
        // Concat demuxer manifest, one absolute path per line. It lives next
        // to the output, inside the request temp dir, and is cleaned up with
        // it.
        let manifest = out
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("concat_list_{}.txt", random_string(4)));
        let mut lines = String::new();
        for input in inputs {
            let absolute = tokio::fs::canonicalize(input).await?;
            lines.push_str(&format!("file '{}'\n", absolute.display()));
        }
        tokio::fs::write(&manifest, lines).await?;

        let manifest_arg = manifest.display().to_string();
        tracing::debug!(clips = inputs.len(), out = %out.display(), "concatenating fragments");
        let result = self
            .run(
                "concat",
                &["-f", "concat", "-safe", "0", "-i", &manifest_arg, "-c", "copy"],
                out,
            )
            .await;

        let _ = tokio::fs::remove_file(&manifest).await;
        result
    }

    async fn compress(&self, input: &Path, out: &Path) -> Result<(), TranscoderFailure> {
        let input_arg = input.display().to_string();
        self.run(
            "compress",
            &["-i", &input_arg, "-codec:a", "libmp3lame", "-qscale:a", "2"],
            out,
        )
        .await
    }
}

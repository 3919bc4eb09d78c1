//! Audio assembly
//!
//! Concatenates the ordered fragments into one waveform and compresses it to
//! the delivery format. The intermediate waveform and every fragment live in
//! the request temp dir and vanish with it; only the compressed artifact
//! escapes to the output directory.

use std::path::{Path, PathBuf};

use crate::transcoder::AudioTranscoder;
use crate::util::random_string;
use crate::ConvertError;

/// Build the final artifact from ordered fragment paths.
///
/// Fails with [`ConvertError::NoOutput`] when no fragment is usable and with
/// [`ConvertError::Transcoder`] when concatenation or compression fails.
pub(crate) async fn assemble(
    transcoder: &dyn AudioTranscoder,
    fragments: &[PathBuf],
    temp_dir: &Path,
    output_dir: &Path,
) -> Result<PathBuf, ConvertError> {
    if fragments.is_empty() {
        tracing::warn!("no usable fragments were produced");
        return Err(ConvertError::NoOutput);
    }

    let waveform = temp_dir.join(format!("final_output_{}.wav", random_string(8)));
    transcoder.concat(fragments, &waveform).await?;

    let artifact = output_dir.join(format!("converted_{}.mp3", random_string(8)));
    match transcoder.compress(&waveform, &artifact).await {
        Ok(()) => Ok(artifact),
        Err(e) => {
            // Never leave a partial artifact behind.
            let _ = tokio::fs::remove_file(&artifact).await;
            Err(e.into())
        }
    }
}

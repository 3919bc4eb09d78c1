//! Synthesis orchestration
//!
//! Each parsed segment becomes zero or more schedulable units, kept strictly
//! in document order (the unit table index is the document position). Silence
//! units resolve eagerly and inline (one cheap transcoder call,
//! order-preserving by construction). Utterance units are spawned onto the
//! shared bounded worker pool the moment they exist, so synthesis overlaps
//! across text runs and voice switches. Fragments are collected only after
//! all work is submitted, iterating units strictly in document order;
//! completion order never influences output order.
//!
//! Per-utterance failures are retried with backoff and then degraded to
//! omission; they never abort the request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use habla_core::{ReplacementRule, SynthesisSettings, VoiceProfile};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::directive::Segment;
use crate::engine::{is_non_empty_file, SynthesisEngine};
use crate::retry::{self, RetryPolicy};
use crate::transcoder::AudioTranscoder;
use crate::util::random_string;
use crate::{normalize, segment};

/// The atomic item the orchestrator schedules; its index in the unit table is
/// its document position.
enum Unit {
    Silence {
        fragment: Option<PathBuf>,
    },
    Utterance {
        text: String,
        handle: JoinHandle<Option<PathBuf>>,
    },
}

/// Normalize, segment, and synthesize every segment; return usable fragment
/// paths in document order.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run(
    segments: Vec<Segment>,
    global_rules: &[ReplacementRule],
    engine: &Arc<dyn SynthesisEngine>,
    transcoder: &Arc<dyn AudioTranscoder>,
    pool: &Arc<Semaphore>,
    policy: RetryPolicy,
    settings: SynthesisSettings,
    temp_dir: &Path,
) -> Vec<PathBuf> {
    let units = schedule(
        segments,
        global_rules,
        engine,
        transcoder,
        pool,
        policy,
        settings,
        temp_dir,
    )
    .await;
    collect(units).await
}

#[allow(clippy::too_many_arguments)]
async fn schedule(
    segments: Vec<Segment>,
    global_rules: &[ReplacementRule],
    engine: &Arc<dyn SynthesisEngine>,
    transcoder: &Arc<dyn AudioTranscoder>,
    pool: &Arc<Semaphore>,
    policy: RetryPolicy,
    settings: SynthesisSettings,
    temp_dir: &Path,
) -> Vec<Unit> {
    let mut units = Vec::new();

    for segment in segments {
        match segment {
            Segment::Silence { seconds } => {
                let fragment = resolve_silence(transcoder.as_ref(), seconds, temp_dir).await;
                units.push(Unit::Silence { fragment });
            }
            Segment::Text { text, voice } => {
                // Voice-specific rules fully shadow the global rules.
                let rules = if voice.replacements.is_empty() {
                    global_rules
                } else {
                    voice.replacements.as_slice()
                };
                let normalized = normalize::normalize(&text, rules);
                if normalized.is_empty() {
                    tracing::debug!("segment empty after normalization, skipping");
                    continue;
                }

                for sentence in segment::split_sentences(&normalized) {
                    let out = temp_dir.join(format!("audio_{}.wav", random_string(8)));
                    let handle = spawn_utterance(
                        sentence.clone(),
                        Arc::clone(&voice),
                        settings,
                        Arc::clone(engine),
                        Arc::clone(pool),
                        policy,
                        out,
                    );
                    units.push(Unit::Utterance {
                        text: sentence,
                        handle,
                    });
                }
            }
        }
    }

    units
}

/// Generate a silence fragment inline. Zero-length requests and transcoder
/// errors resolve to no fragment.
async fn resolve_silence(
    transcoder: &dyn AudioTranscoder,
    seconds: f64,
    temp_dir: &Path,
) -> Option<PathBuf> {
    if seconds <= 0.0 {
        return None;
    }
    let out = temp_dir.join(format!("silence_{}_{}s.wav", random_string(4), seconds));
    match transcoder.write_silence(seconds, &out).await {
        Ok(()) => {
            tracing::debug!(seconds, path = %out.display(), "generated silence fragment");
            Some(out)
        }
        Err(e) => {
            tracing::error!(seconds, error = %e, "silence generation failed");
            None
        }
    }
}

fn spawn_utterance(
    sentence: String,
    voice: Arc<VoiceProfile>,
    settings: SynthesisSettings,
    engine: Arc<dyn SynthesisEngine>,
    pool: Arc<Semaphore>,
    policy: RetryPolicy,
    out: PathBuf,
) -> JoinHandle<Option<PathBuf>> {
    tokio::spawn(async move {
        if sentence.trim().is_empty() {
            return None;
        }
        let _permit = match pool.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return None, // pool closed during shutdown
        };

        let result = retry::bounded(&policy, "synthesis", || {
            engine.synthesize(&sentence, &voice, &settings, &out)
        })
        .await;

        match result {
            Ok(()) => Some(out),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    text = %preview(&sentence),
                    "utterance failed after all attempts, omitting"
                );
                None
            }
        }
    })
}

/// Await every unit in document position order and keep the usable fragments.
async fn collect(units: Vec<Unit>) -> Vec<PathBuf> {
    let mut fragments = Vec::new();

    for unit in units {
        match unit {
            Unit::Silence { fragment } => {
                if let Some(path) = fragment {
                    if is_non_empty_file(&path).await {
                        fragments.push(path);
                    } else {
                        tracing::warn!(path = %path.display(), "skipping empty silence fragment");
                    }
                }
            }
            Unit::Utterance { text, handle } => match handle.await {
                Ok(Some(path)) if is_non_empty_file(&path).await => {
                    fragments.push(path);
                }
                Ok(_) => {
                    tracing::warn!(text = %preview(&text), "skipping utterance with no usable audio");
                }
                Err(e) => {
                    tracing::error!(error = %e, text = %preview(&text), "synthesis task panicked");
                }
            },
        }
    }

    fragments
}

fn preview(text: &str) -> String {
    let mut short: String = text.chars().take(50).collect();
    if short.len() < text.len() {
        short.push_str("...");
    }
    short
}

//! Inline directive parsing
//!
//! Directives use the pattern `<#payload#>`:
//! - `<#2#>` / `<#2.5#>` — insert that many seconds of silence
//! - `<#default#>` — switch back to the request's default voice
//! - `<#voiceIdOrAlias#>` — switch voice, only if that voice exists and its
//!   weights file is present; otherwise the directive is logged and ignored
//!
//! Anything else wrapped in `<#...#>` is consumed as a no-op. The parser
//! tracks the active voice as directives are consumed in order; every literal
//! segment carries the voice that was active when it was produced.

use std::sync::Arc;

use habla_catalog::VoiceCatalog;
use habla_core::VoiceProfile;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<#.*?#>").expect("tag regex"));
static SILENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<#(\d+\.?\d*)#>$").expect("silence regex"));
static VOICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<#([\w-]+)#>$").expect("voice regex"));

/// One parsed piece of the input, in document order.
#[derive(Debug, Clone)]
pub(crate) enum Segment {
    /// Literal text with the voice active at that point
    Text {
        text: String,
        voice: Arc<VoiceProfile>,
    },
    /// Requested silence in seconds
    Silence { seconds: f64 },
}

/// Split `text` into literal runs and directives, resolving voice switches
/// against `catalog` and starting from `default_voice`.
pub(crate) fn parse(
    text: &str,
    catalog: &VoiceCatalog,
    default_voice: &Arc<VoiceProfile>,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current_voice = Arc::clone(default_voice);
    let mut last = 0;

    for tag in TAG_RE.find_iter(text) {
        push_text(&mut segments, &text[last..tag.start()], &current_voice);
        last = tag.end();

        if let Some(caps) = SILENCE_RE.captures(tag.as_str()) {
            // \d+\.?\d* always parses
            if let Ok(seconds) = caps[1].parse::<f64>() {
                segments.push(Segment::Silence { seconds });
            }
        } else if let Some(caps) = VOICE_RE.captures(tag.as_str()) {
            let requested = &caps[1];
            if requested == "default" {
                tracing::debug!(voice = %default_voice.id, "switched to default voice");
                current_voice = Arc::clone(default_voice);
            } else {
                match catalog.resolve(requested).filter(|v| v.is_usable()) {
                    Some(voice) => {
                        tracing::debug!(voice = %voice.id, requested, "switched voice");
                        current_voice = voice;
                    }
                    None => {
                        tracing::warn!(
                            requested,
                            "requested voice not found or weights missing, keeping current voice"
                        );
                    }
                }
            }
        } else {
            tracing::warn!(tag = tag.as_str(), "unrecognized directive, ignoring");
        }
    }

    push_text(&mut segments, &text[last..], &current_voice);
    segments
}

fn push_text(segments: &mut Vec<Segment>, chunk: &str, voice: &Arc<VoiceProfile>) {
    if !chunk.trim().is_empty() {
        segments.push(Segment::Text {
            text: chunk.to_string(),
            voice: Arc::clone(voice),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habla_catalog::load_catalog;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    fn write_voice(dir: &Path, key: &str, id: &str) {
        File::create(dir.join(format!("{key}.onnx"))).unwrap();
        let mut f = File::create(dir.join(format!("{key}.onnx.json"))).unwrap();
        write!(f, "{{\"modelcard\": {{\"id\": \"{id}\"}}}}").unwrap();
    }

    fn fixture() -> (tempfile::TempDir, VoiceCatalog) {
        let dir = tempfile::tempdir().unwrap();
        write_voice(dir.path(), "es_MX-lilith-9494", "es_MX-lilith");
        write_voice(dir.path(), "es_ES-marta-1234", "es_ES-marta");
        let catalog = load_catalog(dir.path()).unwrap();
        (dir, catalog)
    }

    #[test]
    fn test_plain_text_is_one_segment() {
        let (_dir, catalog) = fixture();
        let default = catalog.resolve("es_MX-lilith").unwrap();
        let segments = parse("Hola mundo, sin directivas.", &catalog, &default);
        assert_eq!(segments.len(), 1);
        match &segments[0] {
            Segment::Text { text, voice } => {
                assert_eq!(text, "Hola mundo, sin directivas.");
                assert_eq!(voice.id, "es_MX-lilith");
            }
            other => panic!("expected text segment, got {other:?}"),
        }
    }

    #[test]
    fn test_silence_durations() {
        let (_dir, catalog) = fixture();
        let default = catalog.resolve("es_MX-lilith").unwrap();
        let segments = parse("<#2#><#2.5#>", &catalog, &default);
        assert_eq!(segments.len(), 2);
        let seconds: Vec<f64> = segments
            .iter()
            .map(|s| match s {
                Segment::Silence { seconds } => *seconds,
                other => panic!("expected silence, got {other:?}"),
            })
            .collect();
        assert_eq!(seconds, vec![2.0, 2.5]);
    }

    #[test]
    fn test_unknown_voice_keeps_current() {
        let (_dir, catalog) = fixture();
        let default = catalog.resolve("es_MX-lilith").unwrap();
        let segments = parse("Hola. <#nonsense#> Adiós.", &catalog, &default);
        assert_eq!(segments.len(), 2);
        for segment in &segments {
            match segment {
                Segment::Text { voice, .. } => assert_eq!(voice.id, "es_MX-lilith"),
                other => panic!("expected text, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_voice_switch_and_default() {
        let (_dir, catalog) = fixture();
        let default = catalog.resolve("es_MX-lilith").unwrap();
        let segments = parse("Uno. <#es_ES-marta#> Dos. <#default#> Tres.", &catalog, &default);
        let voices: Vec<&str> = segments
            .iter()
            .map(|s| match s {
                Segment::Text { voice, .. } => voice.id.as_str(),
                other => panic!("expected text, got {other:?}"),
            })
            .collect();
        assert_eq!(voices, vec!["es_MX-lilith", "es_ES-marta", "es_MX-lilith"]);
    }

    #[test]
    fn test_malformed_tag_is_consumed() {
        let (_dir, catalog) = fixture();
        let default = catalog.resolve("es_MX-lilith").unwrap();
        let segments = parse("Hola <#not a tag!#> mundo", &catalog, &default);
        assert_eq!(segments.len(), 2);
        for segment in &segments {
            match segment {
                Segment::Text { text, .. } => assert!(!text.contains("<#")),
                other => panic!("expected text, got {other:?}"),
            }
        }
    }
}

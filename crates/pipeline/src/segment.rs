//! Sentence segmentation
//!
//! Splits normalized text into utterances sized for reliable synthesis and
//! natural prosody. The splitter is an explicit tokenizer over clauses
//! delimited by terminal-punctuation runs, with a set-membership abbreviation
//! guard; it is pure and has no shared state.
//!
//! Rules, in order:
//! 1. split on runs of `. ! ? ¡ ¿ …`, punctuation staying with the clause
//! 2. suppress the split when the clause ends in a known abbreviation
//! 3. drop candidates that are ≤2 characters or carry no alphanumeric
//! 4. re-chunk candidates over 500 characters on commas (~200 per chunk)
//! 5. merge candidates with fewer than 3 word tokens into the previous one
//! 6. if nothing came out, fall back to a simple `[.!?]+` split

use once_cell::sync::Lazy;
use regex::Regex;

static DELIM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?¡¿…]+\s*").expect("delimiter regex"));
static CTRL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n\t]+").expect("control regex"));
static ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-ZáéíóúñüÁÉÍÓÚÑÜ0-9]").expect("alnum regex"));
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]+").expect("word regex"));
static FALLBACK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+\s+").expect("fallback regex"));

/// Titles, honorifics, and unit abbreviations whose trailing period is not a
/// sentence boundary, across the supported languages (es, en, fr, de, it, pt).
static ABBREVIATIONS: &[&str] = &[
    // Spanish
    "Sr", "Sra", "Srta", "Dr", "Dra", "Prof", "Profa", "Lic", "Licda", "Ing", "Inga", "Arq",
    "Arqa", "Mtro", "Mtra", "etc", "vs", "p.ej", "i.e", "cf", "vol", "cap", "art", "núm", "pág",
    "ed", "op.cit",
    // English
    "Mr", "Mrs", "Ms", "Miss", "Inc", "Ltd", "Corp", "Co", "e.g", "ch", "no", "pg",
    // French
    "M", "Mme", "Mlle", "p.ex", "c.à.d", "n°", "p", "éd",
    // German
    "Hr", "Fr", "Frl", "z.B", "d.h", "vgl", "Bd", "Kap", "Art", "Nr", "S", "Hrsg",
    // Italian
    "Sig", "Sig.ra", "Sig.na", "ecc", "ad.es", "cioè", "cfr", "n",
    // Portuguese
    "p.ex", "ou.seja",
];

const MAX_SENTENCE_CHARS: usize = 500;
const CHUNK_TARGET_CHARS: usize = 200;
const MIN_WORD_TOKENS: usize = 3;

/// Whether a clause-final token is a known abbreviation (e.g. `Sr.`, `etc.,`).
fn ends_in_abbreviation(last_word: &str) -> bool {
    ABBREVIATIONS.iter().any(|abbr| {
        last_word
            .strip_prefix(abbr)
            .is_some_and(|rest| rest.starts_with('.'))
    })
}

fn word_count(text: &str) -> usize {
    WORD_RE.find_iter(text).count()
}

fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Split normalized text into an ordered, non-empty list of utterances.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let raw = tokenize_clauses(text);
    let mut sentences = clean_and_merge(raw);

    if sentences.is_empty() {
        sentences = fallback_split(text);
    }

    if !sentences.is_empty() {
        tracing::debug!(count = sentences.len(), "text split into utterances");
    }
    sentences
}

/// Walk terminal-punctuation runs, emitting a clause at each run unless the
/// clause's trailing token is an abbreviation.
///
/// Inverted marks (`¡` `¿`) trailing a run are sentence openers, not
/// terminators: they carry over into the clause that follows.
fn tokenize_clauses(text: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    let mut current = String::new();
    let mut last = 0;

    for delim in DELIM_RE.find_iter(text) {
        current.push_str(&text[last..delim.start()]);
        last = delim.end();

        let matched = delim.as_str();
        let punct = matched.trim_end();
        let trailing_ws = &matched[punct.len()..];
        let opener_len: usize = punct
            .chars()
            .rev()
            .take_while(|c| matches!(c, '¡' | '¿'))
            .map(char::len_utf8)
            .sum();
        let (terminal, openers) = punct.split_at(punct.len() - opener_len);

        if terminal.is_empty() {
            // A bare opener run is not a boundary.
            current.push_str(openers);
            current.push_str(trailing_ws);
            continue;
        }

        current.push_str(terminal);
        current.push_str(trailing_ws);

        let trimmed = current.trim();
        let words: Vec<&str> = trimmed.split_whitespace().collect();
        // A single-token clause cannot end in a title abbreviation.
        let last_word = if words.len() > 1 {
            words[words.len() - 1]
        } else {
            ""
        };
        if !ends_in_abbreviation(last_word) {
            clauses.push(trimmed.to_string());
            current.clear();
        }
        current.push_str(openers);
    }

    current.push_str(&text[last..]);
    if !current.trim().is_empty() {
        clauses.push(current.trim().to_string());
    }
    clauses
}

/// Filter trivial clauses, re-chunk oversized ones, and merge short ones into
/// their predecessor.
fn clean_and_merge(clauses: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();

    for clause in clauses {
        let clean = CTRL_RE.replace_all(&clause, " ").trim().to_string();
        if char_count(&clean) <= 2 || !ALNUM_RE.is_match(&clean) {
            continue;
        }

        if char_count(&clean) > MAX_SENTENCE_CHARS {
            cleaned.extend(rechunk_by_commas(&clean));
        } else if word_count(&clean) >= MIN_WORD_TOKENS {
            cleaned.push(clean);
        } else if let Some(previous) = cleaned.last_mut() {
            previous.push(' ');
            previous.push_str(&clean);
        } else if char_count(&clean) > 2 {
            // First sentence: keep it if non-trivial.
            cleaned.push(clean);
        }
    }

    cleaned
}

/// Split an oversized sentence on commas and greedily regroup the pieces into
/// chunks near the target size.
fn rechunk_by_commas(sentence: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for part in sentence.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !current.is_empty() && char_count(&current) + 2 + char_count(part) > CHUNK_TARGET_CHARS {
            chunks.push(std::mem::take(&mut current));
            current.push_str(part);
        } else if current.is_empty() {
            current.push_str(part);
        } else {
            current.push_str(", ");
            current.push_str(part);
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Simpler split used when the main tokenizer produced nothing.
fn fallback_split(text: &str) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();

    for piece in FALLBACK_RE.split(text.trim()) {
        let piece = piece.trim();
        if piece.is_empty() || !ALNUM_RE.is_match(piece) {
            continue;
        }
        if char_count(piece) > 2 && word_count(piece) >= MIN_WORD_TOKENS {
            sentences.push(piece.to_string());
        } else if let Some(previous) = sentences.last_mut() {
            previous.push(' ');
            previous.push_str(piece);
        } else if char_count(piece) > 2 {
            sentences.push(piece.to_string());
        }
    }

    sentences
}

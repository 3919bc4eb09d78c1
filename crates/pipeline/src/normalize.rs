//! Text normalization
//!
//! Converts a literal-text segment into a clean, speakable string before
//! sentence segmentation. Steps run in a fixed order and each is total:
//!
//! 1. strip fenced code blocks (speech should never include code)
//! 2. line-break repair and punctuation cleanup, including the enumeration
//!    rewrite ("3. " / "tres. " become "3, " / "tres, ") so the synthesizer
//!    does not treat list numbering as sentence boundaries
//! 3. replacement rules (voice-specific rules fully shadow global rules)
//! 4. whitespace collapse and trim
//!
//! Replacement matching is whole-word and case-insensitive. The original rule
//! for digit tokens used a regex lookahead; lookaround is not available here,
//! so matches are checked against the following character explicitly.

use habla_core::ReplacementRule;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[^`\n]*\n.*?```").expect("code fence regex"));
static MULTI_PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(\s*\.)+").expect("multi period regex"));
static SPACE_PERIOD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s\.").expect("space period regex"));
static SPACE_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s,").expect("space comma regex"));
static COMMA_PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*\.").expect("comma period regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

// Spelled-out numbers up to thirty; enumeration headings like "tres." read
// better as "tres," than as a sentence break.
static SPELLED_ENUM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(uno|dos|tres|cuatro|cinco|seis|siete|ocho|nueve|diez|once|doce|trece|catorce|quince|dieciséis|diecisiete|dieciocho|diecinueve|veinte|veintiuno|veintidós|veintitrés|veinticuatro|veinticinco|veintiséis|veintisiete|veintiocho|veintinueve|treinta)\.\s+",
    )
    .expect("spelled enumeration regex")
});
static DIGIT_ENUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\.\s+").expect("digit enumeration regex"));

/// Normalize a literal-text segment with the given replacement rules.
///
/// Returns a possibly empty string; empty output means the segment
/// contributes nothing and is dropped before segmentation.
pub(crate) fn normalize(text: &str, rules: &[ReplacementRule]) -> String {
    let text = CODE_FENCE_RE.replace_all(text, "");
    let text = repair_line_breaks(&text);
    let text = apply_replacements(&text, rules);
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// Drop blank lines, append a comma to non-final lines missing terminal
/// punctuation, join with spaces, then clean up stray punctuation.
fn repair_line_breaks(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return String::new();
    }

    let mut processed = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i < lines.len() - 1 && !line.ends_with(['.', '!', '?', ',', ':', ';']) {
            processed.push(format!("{line},"));
        } else {
            processed.push((*line).to_string());
        }
    }

    let text = processed.join(" ");
    let text = add_comma_after_paren(&text);
    let text = MULTI_PERIOD_RE.replace_all(&text, ".");
    let text = SPACE_PERIOD_RE.replace_all(&text, ".");
    let text = SPACE_COMMA_RE.replace_all(&text, ",");
    let text = COMMA_PERIOD_RE.replace_all(&text, ",");
    let text = SPELLED_ENUM_RE.replace_all(&text, "$1, ");
    let text = DIGIT_ENUM_RE.replace_all(&text, "$1, ");
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// A closing parenthesis followed by whitespace (or end of text) reads as a
/// pause; make the pause explicit with a comma.
fn add_comma_after_paren(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == ')' {
            match chars.peek() {
                None => out.push(','),
                Some(next) if next.is_whitespace() => out.push(','),
                _ => {}
            }
        }
    }
    out
}

/// Apply ordered replacement rules with whole-word, case-insensitive matching.
fn apply_replacements(text: &str, rules: &[ReplacementRule]) -> String {
    let mut text = text.to_string();
    for rule in rules {
        if rule.find.is_empty() {
            continue;
        }
        let escaped = regex::escape(&rule.find);

        if rule.find.ends_with('.') {
            // Abbreviations like "Mr." anchor a word boundary before the
            // literal; the trailing period is part of the match.
            let Ok(re) = Regex::new(&format!(r"(?i)\b{escaped}")) else {
                continue;
            };
            text = re.replace_all(&text, NoExpand(&rule.replace)).into_owned();
        } else if rule.find.contains(' ') {
            // Exact phrase match keeps "15 días" safe from the "1" and "5"
            // rules firing separately.
            let Ok(re) = Regex::new(&format!(r"(?i)\b{escaped}\b")) else {
                continue;
            };
            text = re.replace_all(&text, NoExpand(&rule.replace)).into_owned();
        } else if rule.find.chars().all(|c| c.is_ascii_digit()) {
            let Ok(re) = Regex::new(&format!(r"\b{escaped}")) else {
                continue;
            };
            text = replace_digit_token(&text, &re, &rule.replace);
        } else {
            let Ok(re) = Regex::new(&format!(r"(?i)\b{escaped}\b")) else {
                continue;
            };
            text = re.replace_all(&text, NoExpand(&rule.replace)).into_owned();
        }
    }
    text
}

/// Substitute a standalone digit token, skipping matches that sit inside a
/// larger number, a comma-grouped number, or a decimal. A period after the
/// match only counts as enumeration (replaceable) when whitespace follows it.
fn replace_digit_token(text: &str, re: &Regex, replace: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in re.find_iter(text) {
        let mut following = text[m.end()..].chars();
        let standalone = match following.next() {
            None => true,
            Some(c) if c.is_ascii_digit() || c == ',' => false,
            Some('.') => matches!(following.next(), Some(n) if n.is_whitespace()),
            Some(_) => true,
        };
        if standalone {
            out.push_str(&text[last..m.start()]);
            out.push_str(replace);
            last = m.end();
        }
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(find: &str, replace: &str) -> ReplacementRule {
        ReplacementRule::new(find, replace)
    }

    #[test]
    fn test_code_blocks_removed() {
        let text = "Antes.\n```rust\nfn main() {}\n```\nDespués.";
        let out = normalize(text, &[]);
        assert!(!out.contains("fn main"));
        assert!(out.contains("Antes."));
        assert!(out.contains("Después."));
    }

    #[test]
    fn test_line_breaks_become_commas() {
        let out = normalize("primera línea\nsegunda línea.", &[]);
        assert_eq!(out, "primera línea, segunda línea.");
    }

    #[test]
    fn test_blank_lines_dropped() {
        let out = normalize("uno,\n\n\ndos.", &[]);
        assert_eq!(out, "uno, dos.");
    }

    #[test]
    fn test_enumeration_periods_become_commas() {
        let out = normalize("Hay tres pasos. 1. Abrir. 2. Cerrar.", &[]);
        assert!(out.contains("1, Abrir."));
        assert!(out.contains("2, Cerrar."));
        let out = normalize("Primero uno. luego dos. y ya.", &[]);
        assert!(out.contains("uno, luego"));
        assert!(out.contains("dos, y ya."));
    }

    #[test]
    fn test_digit_replacement_respects_larger_numbers() {
        let rules = [rule("5", "cinco")];
        assert_eq!(normalize("tiene 5 gatos", &rules), "tiene cinco gatos");
        assert_eq!(normalize("tiene 15 gatos", &rules), "tiene 15 gatos");
        assert_eq!(normalize("cuesta 5,000 pesos", &rules), "cuesta 5,000 pesos");
        assert_eq!(normalize("versión 5.2 lista", &rules), "versión 5.2 lista");
    }

    #[test]
    fn test_abbreviation_replacement_at_word_boundary() {
        let rules = [rule("Mr.", "Míster")];
        assert_eq!(normalize("Mr. Smith llegó", &rules), "Míster Smith llegó");
        // "Mrs." must not be touched by the "Mr." rule
        assert_eq!(normalize("Mrs. Smith llegó", &rules), "Mrs. Smith llegó");
    }

    #[test]
    fn test_phrase_replacement_is_exact() {
        let rules = [rule("1 día", "un día"), rule("1", "uno")];
        assert_eq!(normalize("en 1 día llega", &rules), "en un día llega");
        assert_eq!(normalize("en 15 días llega", &rules), "en 15 días llega");
    }

    #[test]
    fn test_replacement_is_case_insensitive() {
        let rules = [rule("km", "kilómetros")];
        assert_eq!(normalize("faltan 3 KM todavía", &rules), "faltan 3 kilómetros todavía");
    }

    #[test]
    fn test_idempotent_without_code_blocks() {
        let inputs = [
            "línea uno\nlínea dos\ncon 3. elementos (como este) y más",
            "Hola.  Mundo con   espacios.",
            "lista: 1. uno. 2. dos. 3. tres.",
        ];
        for input in inputs {
            let once = normalize(input, &[]);
            let twice = normalize(&once, &[]);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_empty_output_for_nonspoken_input() {
        assert_eq!(normalize("```\ncode only\n```", &[]), "");
        assert_eq!(normalize("   \n \n", &[]), "");
    }
}

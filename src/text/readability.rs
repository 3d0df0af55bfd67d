//! Readability normalization: the final shaping pass before tidy-up.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::segment::{has_terminal_punctuation, starts_with_question_word};

static TRAILING_CONJUNCTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:and|or|but|so|because|then)\b\s*$").unwrap());
static MISSING_SENTENCE_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])\s+((?:The|Then|And|But)\s+[A-Z]?[a-z])").unwrap());
static EMBEDDED_SHOULD_QUESTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bif\s+i\s+ask\s+should\s+(?P<body>.+?)\s+(?P<tail>keep it as a question\b)")
        .unwrap()
});
static I_CONTRACTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bi(?P<suffix>('|’)(?:m|d|ll|ve|re|s))\b").unwrap());
static STANDALONE_I_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bi\b").unwrap());

/// Words required before a missing terminal period is appended.
const TERMINAL_PERIOD_MIN_WORDS: usize = 8;
/// Words required before question-shaped text gets a terminal `?`.
const QUESTION_MARK_MIN_WORDS: usize = 3;

/// Trim trailing conjunctions, insert missing sentence breaks, promote
/// `i` → `I`, sentence-case after `.?!`, and append a terminal period to
/// long unpunctuated text.
pub fn normalize_readability(text: &str) -> String {
    let mut text = text.trim().to_string();
    text = text.trim_end_matches([' ', ',', ';', ':']).to_string();
    text = TRAILING_CONJUNCTION_RE.replace(&text, "").into_owned();
    text = text.trim_end_matches([' ', ',', ';', ':']).to_string();

    text = MISSING_SENTENCE_BREAK_RE
        .replace_all(&text, "${1}. ${2}")
        .into_owned();

    text = EMBEDDED_SHOULD_QUESTION_RE
        .replace_all(&text, |caps: &Captures| {
            let body = caps
                .name("body")
                .unwrap()
                .as_str()
                .trim_matches(|c: char| " ,.;:".contains(c));
            format!("if I ask, should {body}? {}", &caps["tail"])
        })
        .into_owned();

    text = I_CONTRACTION_RE.replace_all(&text, "I${suffix}").into_owned();
    text = STANDALONE_I_RE.replace_all(&text, "I").into_owned();
    text = capitalize_sentence_starts(&text);

    if !has_terminal_punctuation(&text) && !text.is_empty() {
        let words = text.split_whitespace().count();
        if words >= QUESTION_MARK_MIN_WORDS && starts_with_question_word(&text) {
            // Dictated questions stay questions; the terminal `?` is what
            // keeps downstream answer guards honest.
            text = format!("{}?", text.trim_end());
        } else if words >= TERMINAL_PERIOD_MIN_WORDS {
            text = format!("{}.", text.trim_end());
        }
    }
    text
}

/// Uppercase the first letter of the text and of every sentence that
/// follows `.`, `!` or `?` plus a single space.
fn capitalize_sentence_starts(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &ch) in chars.iter().enumerate() {
        let at_sentence_start = i == 0
            || (i >= 2
                && chars[i - 1].is_whitespace()
                && matches!(chars[i - 2], '.' | '!' | '?'));
        if at_sentence_start && ch.is_ascii_lowercase() {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

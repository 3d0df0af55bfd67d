//! Refiner output guards: prompt-leakage sanitation and answer-drift
//! rejection.
//!
//! A small instruction-tuned model given transcription text will sometimes
//! echo its own instructions back, prepend meta-commentary, or — worst —
//! answer a dictated question instead of transcribing it.  Everything here
//! is pure so the guards are tested without a model.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::segment::looks_like_question;

/// Upper bound on vocabulary hints included in the system prompt.
pub const MAX_VOCAB_HINTS: usize = 24;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9_']+").unwrap());
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*]\s+").unwrap());
static PREAMBLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(cleaned text|corrected text|revised text|output|answer|response|explanation|final|result)\s*:\s*",
    )
    .unwrap()
});
static ANSWER_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(yes|no|it\s+is|it's|this\s+is|the\s+answer|you\s+can|you\s+should|because|in\s+summary|to\s+answer|ja|nein|die\s+antwort|du\s+kannst|sie\s+können|weil|kurz\s+gesagt)\b",
    )
    .unwrap()
});
static ASSISTANTY_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(sure|certainly|absolutely|here(?:'s| is)|let's|i can|you can|to do this|first,|here are|this version)\b",
    )
    .unwrap()
});

/// Substrings that mark a line as leaked prompt or meta-commentary.
const LEAK_MARKERS: &[&str] = &[
    "you are a",
    "system prompt",
    "rules:",
    "self-correction examples",
    "as an ai",
    "this version is",
    "directly addresses the question",
    "refined version",
    "rewritten version",
    "concise and directly",
    "here is the cleaned",
    "output only cleaned",
    "never answer",
    "never add content",
    "keep question intent",
];

/// Words too common to count as content keywords.
const COMMON_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "how", "i", "in",
    "is", "it", "its", "me", "my", "of", "on", "or", "our", "that", "the", "this", "to", "we",
    "what", "when", "where", "which", "who", "why", "with", "you", "your",
];

// ---------------------------------------------------------------------------
// Sanitation
// ---------------------------------------------------------------------------

/// Strip prompt leakage and meta responses from model output.
///
/// Lines are inspected in order after removing code fences, bullet markers
/// and preamble prefixes; the first line free of leak markers wins.
/// Returns an empty string when nothing survives.
pub fn sanitize_output(result: &str) -> String {
    let text = result.trim();
    if text.is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let lines = if lines.is_empty() { vec![text] } else { lines };

    for line in lines {
        let candidate = line.trim().trim_matches('`').trim();
        let candidate = BULLET_RE.replace(candidate, "");
        let candidate = PREAMBLE_RE.replace(&candidate, "");
        let candidate = candidate
            .trim()
            .trim_matches('`')
            .trim_matches('"')
            .trim_matches('\'')
            .trim();
        if candidate.is_empty() {
            continue;
        }
        let lower = candidate.to_lowercase();
        if LEAK_MARKERS.iter().any(|marker| lower.contains(marker)) {
            continue;
        }
        return candidate.to_string();
    }
    String::new()
}

// ---------------------------------------------------------------------------
// Answer-drift guard
// ---------------------------------------------------------------------------

fn keywords(text: &str) -> HashSet<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.len() > 2 && !COMMON_WORDS.contains(&t.as_str()))
        .collect()
}

/// Detect when model output drifts into a generated answer instead of a
/// cleaned transcription.
pub fn is_answer_like(source: &str, candidate: &str) -> bool {
    let source_words = source.split_whitespace().count();
    let candidate_words = candidate.split_whitespace().count();
    if candidate_words > (source_words * 2).max(source_words + 12) {
        return true;
    }

    let lower_candidate = candidate.trim().to_lowercase();
    if lower_candidate.starts_with("answer:")
        || lower_candidate.starts_with("response:")
        || lower_candidate.starts_with("explanation:")
    {
        return true;
    }
    if ASSISTANTY_START_RE.is_match(candidate) && !ASSISTANTY_START_RE.is_match(source) {
        return true;
    }

    if looks_like_question(source) {
        if ANSWER_START_RE.is_match(&lower_candidate) {
            return true;
        }
        // A spoken question must stay a question.
        if !looks_like_question(candidate) {
            return true;
        }
    }

    let candidate_keywords = keywords(candidate);
    if !candidate_keywords.is_empty() {
        let source_keywords = keywords(source);
        let new_tokens = candidate_keywords.difference(&source_keywords).count();
        let novelty_ratio = new_tokens as f32 / candidate_keywords.len() as f32;
        if novelty_ratio > 0.45 && candidate_keywords.len() >= 6 {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Vocabulary hints + output budget
// ---------------------------------------------------------------------------

/// Pick only the vocabulary entries that share a token with `text`, keeping
/// the prompt small.  A tiny deterministic fallback set is used when
/// nothing overlaps (short technical phrases often miss).
pub fn select_vocab_hints(
    text: &str,
    vocabulary: &HashMap<String, String>,
    max_hints: usize,
) -> Vec<(String, String)> {
    if vocabulary.is_empty() {
        return Vec::new();
    }

    let text_tokens: HashSet<String> = TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect();

    let mut scored: Vec<(usize, String, String)> = Vec::new();
    for (wrong, right) in vocabulary {
        let combined = format!("{wrong} {right}");
        let vocab_tokens: HashSet<String> = TOKEN_RE
            .find_iter(&combined)
            .map(|m| m.as_str().to_lowercase())
            .filter(|t| t.len() > 1)
            .collect();
        let overlap = vocab_tokens.intersection(&text_tokens).count();
        if overlap > 0 {
            scored.push((overlap, wrong.clone(), right.clone()));
        }
    }

    if scored.is_empty() {
        let mut entries: Vec<(String, String)> = vocabulary
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort();
        entries.truncate((max_hints / 2).min(8));
        return entries;
    }

    scored.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| a.1.len().cmp(&b.1.len()))
            .then_with(|| a.1.cmp(&b.1))
    });
    scored
        .into_iter()
        .take(max_hints)
        .map(|(_, wrong, right)| (wrong, right))
        .collect()
}

/// Output token budget: `clamp(⌈words × 1.2⌉, 20, 80)`.
///
/// Long texts are already gated out of refinement, so the ceiling doubles
/// as a truncation bound for runaway generations.
pub fn max_output_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count() as f32;
    ((words * 1.2).ceil() as u32).clamp(20, 80)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Self-correction rewriting ("no no, modify the refiner file").
//!
//! Speakers backtrack mid-dictation.  The cues fall into two buckets:
//! strong cues ("no no", "i mean", "scratch that", ...) always replace the
//! preceding fragment; the weak cue ("sorry") replaces only when the
//! preceding fragment looks like a direct edit command, because "sorry"
//! also appears in ordinary speech.

use once_cell::sync::Lazy;
use regex::Regex;

use super::disfluency::strip_leading_discourse;
use super::segment::split_sentences;

static CORRECTION_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?P<cue>no\s*,\s*no|no\s+no|sorry|rather|correction|i mean|i meant|wait no|no wait|scratch that|never mind(?: that)?|let me rephrase)\b[\s,:-]*",
    )
    .unwrap()
});
static INLINE_CORRECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<prefix>.+?)\s*(?:,\s*|\s+)(?P<cue>sorry|rather|i mean|i meant|no wait|wait no|no\s*,?\s*no|scratch that|never mind(?: that)?|let me rephrase)\b[\s,:-]*(?P<replacement>.+)$",
    )
    .unwrap()
});
static VERB_TARGET_OF_APP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(.*?\b(?:change|update|modify|refactor|improve|fix)\b\s+)(?:the\s+)?(.+?)(\s+of\s+the\s+app)([.!?]?)$",
    )
    .unwrap()
});
static VERB_TO_TARGET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(.*?\b(?:change|set|switch|rename|call|use|move)\b\s+(?:it|this|that|the\s+\w+)?\s*to\s+)(.+?)([.!?]?)$",
    )
    .unwrap()
});
static VERB_TRAILING_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(.*?\b(?:call|name|rename|select|choose)\b\s+(?:the\s+\w+\s+)?)([A-Za-z0-9_.:-]+)([.!?]?)$",
    )
    .unwrap()
});
static VERB_OPEN_END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.*?\b(?:use|call|name|rename|set|switch|move)\b)\s*$").unwrap()
});
static ACTION_CLAUSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<head>.*?)(?P<clause>(?:i\s+(?:want|need)\s+to\s+)?(?:change|update|modify|refactor|improve|fix|rename|move|set|switch|use|call)\b.+)$",
    )
    .unwrap()
});
static INTENT_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?P<intent>i\s+(?:want|need)\s+to)\s+(?P<rest>.+)$").unwrap());
static ACTION_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:i\s+(?:want|need)\s+to\s+)?(?:change|update|modify|refactor|improve|fix|rename|move|set|switch|use|call)\b",
    )
    .unwrap()
});
static ARTICLE_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(the|a|an)\b").unwrap());

const STRONG_REPLACE_CUES: &[&str] = &[
    "no no",
    "no wait",
    "wait no",
    "i mean",
    "i meant",
    "rather",
    "correction",
    "scratch that",
    "never mind",
    "never mind that",
    "let me rephrase",
];
const WEAK_REPLACE_CUES: &[&str] = &["sorry"];

/// Correction cue presence check used by the refinement gate and the
/// completeness fallback: a raw text with a cue must keep the strict
/// correction-rewriting path.
static CORRECTION_CUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(sorry|i mean|i meant|actually|no wait|wait no|scratch that|never mind|let me rephrase|correction|rather)\b",
    )
    .unwrap()
});

/// Whether `text` contains any spoken correction cue.
pub fn has_correction_cue(text: &str) -> bool {
    CORRECTION_CUE_RE.is_match(text) || text.to_lowercase().contains("no no")
}

/// Strong cues only — the ones that always trigger sentence replacement.
/// "actually" and "sorry" are excluded: they occur in ordinary speech and
/// must not exempt a transcript from the completeness fallback.
static STRONG_CUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(i mean|i meant|no wait|wait no|scratch that|never mind|let me rephrase|correction|rather)\b",
    )
    .unwrap()
});

/// Whether `text` contains a strong (always-replace) correction cue.
pub fn has_strong_correction_cue(text: &str) -> bool {
    STRONG_CUE_RE.is_match(text) || text.to_lowercase().contains("no no")
}

/// Rewrite explicit backtracks sentence by sentence.
pub fn apply_self_corrections(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();

    for sentence in split_sentences(text.trim()) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        if let Some(caps) = INLINE_CORRECTION_RE.captures(sentence) {
            let prefix = caps.name("prefix").unwrap().as_str().trim();
            let cue = normalize_cue(caps.name("cue").unwrap().as_str());
            let replacement = trim_correction_edges(caps.name("replacement").unwrap().as_str());
            if should_replace_previous(&cue, prefix, &replacement) {
                out.push(merge_with_previous(prefix, &replacement));
            } else {
                out.push(ensure_terminal_punctuation(prefix));
                out.push(ensure_terminal_punctuation(&replacement));
            }
            continue;
        }

        if let Some(caps) = CORRECTION_PREFIX_RE.captures(sentence) {
            let cue = normalize_cue(caps.name("cue").unwrap().as_str());
            let replacement = trim_correction_edges(&sentence[caps.get(0).unwrap().end()..]);
            if replacement.is_empty() {
                continue;
            }
            let replace_previous = out
                .last()
                .is_some_and(|prev| should_replace_previous(&cue, prev, &replacement));
            if replace_previous {
                let prev = out.pop().unwrap();
                out.push(merge_with_previous(&prev, &replacement));
            } else {
                out.push(ensure_terminal_punctuation(&replacement));
            }
            continue;
        }

        out.push(sentence.to_string());
    }

    out.join(" ")
}

fn normalize_cue(cue: &str) -> String {
    cue.trim()
        .to_lowercase()
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn trim_correction_edges(text: &str) -> String {
    text.trim_matches(|c: char| " ,.-".contains(c)).to_string()
}

fn should_replace_previous(cue: &str, previous: &str, replacement: &str) -> bool {
    if STRONG_REPLACE_CUES.contains(&cue) {
        return true;
    }
    if WEAK_REPLACE_CUES.contains(&cue) {
        let edit_command = VERB_TO_TARGET_RE.is_match(previous)
            || VERB_TRAILING_TOKEN_RE.is_match(previous)
            || ACTION_START_RE.is_match(previous);
        return edit_command && replacement.split_whitespace().count() <= 10;
    }
    false
}

fn ensure_terminal_punctuation(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    if text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

/// Merge a replacement into the preceding fragment by structural pattern.
fn merge_with_previous(previous: &str, replacement: &str) -> String {
    let previous = strip_leading_discourse(previous).trim().to_string();
    let mut replacement = strip_leading_discourse(replacement)
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .to_string();

    // Chained cues ("no no, i mean the parser") reduce to their final target.
    loop {
        let stripped = trim_correction_edges(&CORRECTION_PREFIX_RE.replace(&replacement, ""));
        if stripped == replacement {
            break;
        }
        replacement = stripped;
    }

    // "... change the functionality of the app." + "modularity of the app"
    if let Some(caps) = VERB_TARGET_OF_APP_RE.captures(&previous) {
        let prefix = caps.get(1).unwrap().as_str();
        let suffix = caps.get(3).unwrap().as_str();
        let punctuation = caps.get(4).unwrap().as_str();
        let mut rep = replacement.clone();
        if rep.to_lowercase().ends_with("of the app") {
            rep = rep[..rep.len() - "of the app".len()].trim().to_string();
        }
        if !rep.is_empty() {
            let article = if ARTICLE_START_RE.is_match(&rep) { "" } else { "the " };
            let punct = if punctuation.is_empty() { "." } else { punctuation };
            return format!("{prefix}{article}{rep}{suffix}{punct}");
        }
    }

    // "... change it to X" + "Y"
    if !replacement.is_empty() {
        if let Some(caps) = VERB_TO_TARGET_RE.captures(&previous) {
            let prefix = caps.get(1).unwrap().as_str();
            let punctuation = caps.get(3).unwrap().as_str();
            let punct = if punctuation.is_empty() { "." } else { punctuation };
            return format!("{prefix}{replacement}{punct}");
        }

        if let Some(caps) = VERB_TRAILING_TOKEN_RE.captures(&previous) {
            let prefix = caps.get(1).unwrap().as_str();
            let punctuation = caps.get(3).unwrap().as_str();
            let punct = if punctuation.is_empty() { "." } else { punctuation };
            return format!("{prefix}{replacement}{punct}");
        }

        if let Some(caps) = VERB_OPEN_END_RE.captures(&previous) {
            let prefix = caps.get(1).unwrap().as_str().trim();
            return format!("{prefix} {replacement}.");
        }
    }

    // Keep surrounding context for action-style corrections:
    // "we have a problem ... i want to modify X no no modify Y"
    if let Some(caps) = ACTION_CLAUSE_RE.captures(&previous) {
        if ACTION_START_RE.is_match(&replacement) {
            let head = caps.name("head").unwrap().as_str().trim();
            let clause = caps
                .name("clause")
                .unwrap()
                .as_str()
                .trim()
                .trim_end_matches(['.', '!', '?']);
            let mut replacement_clause =
                replacement.trim_end_matches(['.', '!', '?']).to_string();
            if let Some(intent_caps) = INTENT_PREFIX_RE.captures(clause) {
                if !INTENT_PREFIX_RE.is_match(&replacement_clause) {
                    let intent = intent_caps.name("intent").unwrap().as_str().trim();
                    replacement_clause = format!("{intent} {replacement_clause}");
                }
            }
            let merged = format!("{head} {replacement_clause}").trim().to_string();
            return format!("{merged}.");
        }
    }

    ensure_terminal_punctuation(&replacement)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

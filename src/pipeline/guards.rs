//! Transcript guards: hallucination blocklist, prompt-echo filter, the
//! refinement gate, truncation/intent checks, and completeness
//! preservation.
//!
//! The blocklist and echo fragments are data, not logic — they enumerate
//! strings the decoder is known to produce from silence or from its own
//! bias prompt.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::segment::{
    ends_with_orphan_conjunction, has_terminal_punctuation, looks_like_question, split_sentences,
};
use crate::text::corrections::has_strong_correction_cue;
use crate::text::{clean_conservative, has_correction_cue};

/// Exact transcripts (case-insensitive, trimmed) the decoder hallucinates
/// from silence.
const HALLUCINATION_BLOCKLIST: &[&str] =
    &["thank you.", "thanks.", "thanks for watching.", "you", "...", ",,,"];

/// Fragments of the decoder bias prompt; a short transcript containing one
/// is the prompt echoed back, not speech.
const PROMPT_ECHO_FRAGMENTS: &[&str] = &[
    "transcribe clearly",
    "natural punctuation",
    "software development dictation",
    "well-punctuated transcription",
    "software development session",
    "softwareentwicklungssitzung",
    "klar und korrekt transkribieren",
];

/// Prompt echoes only matter on short outputs; real dictation containing
/// one of the fragments verbatim would be longer.
const PROMPT_ECHO_MAX_WORDS: usize = 15;

static DISFLUENCY_CUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(um+|uh+|hmm+|ah+|er+|basically|you know|sort of|kind of|literally|i mean)\b")
        .unwrap()
});
static COMPLEX_STRUCTURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[,;:]|\b(and|but|because|then)\b").unwrap());
static FILE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@[A-Za-z0-9_.-]+").unwrap());
static BARE_TAG_SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@[A-Za-z0-9_.-]+[.!?]?$").unwrap());
static EDIT_ACTION_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:please\s+)?(?:i\s+(?:want|need)\s+to\s+)?(?:update|modify|change|fix|rename|refactor|edit|improve)\b",
    )
    .unwrap()
});

// ---------------------------------------------------------------------------
// Hallucination + prompt echo
// ---------------------------------------------------------------------------

/// Exact-match check against the silence-hallucination blocklist.
pub fn is_hallucination(raw: &str) -> bool {
    let normalized = raw.trim().to_lowercase();
    HALLUCINATION_BLOCKLIST.contains(&normalized.as_str())
}

/// Short transcript that echoes the decoder bias prompt.
pub fn is_prompt_echo(raw: &str) -> bool {
    if raw.split_whitespace().count() >= PROMPT_ECHO_MAX_WORDS {
        return false;
    }
    let lower = raw.to_lowercase();
    PROMPT_ECHO_FRAGMENTS.iter().any(|f| lower.contains(f))
}

// ---------------------------------------------------------------------------
// Refinement gate
// ---------------------------------------------------------------------------

/// Whether `cleaned` should be offered to the LLM refiner.
///
/// The ladder prefers determinism: questions are never refined (the
/// refiner must not get a chance to answer them), and long dictation skips
/// refinement entirely because the model's output budget would truncate
/// it.  Correction cues override most of the ladder — rewriting backtracks
/// is exactly what the refiner is good at.
pub fn should_refine(cleaned: &str, raw: &str) -> bool {
    let words = cleaned.split_whitespace().count();
    if words < 4 {
        return false;
    }
    if words >= 60 {
        return false;
    }
    if looks_like_question(cleaned) {
        return false;
    }
    if has_correction_cue(cleaned) || has_correction_cue(raw) {
        return true;
    }
    if DISFLUENCY_CUE_RE.is_match(raw) && raw.split_whitespace().count() < 24 {
        return true;
    }
    if words >= 24 {
        return false;
    }
    let terminal = has_terminal_punctuation(cleaned);
    if split_sentences(cleaned).len() >= 2 && words >= 16 {
        return false;
    }
    if words >= 40 && terminal {
        return false;
    }
    if words <= 10 {
        return false;
    }
    if words < 14 && terminal {
        return false;
    }
    let complex = COMPLEX_STRUCTURE_RE.is_match(cleaned);
    if !complex && terminal && words < 24 {
        return false;
    }
    if complex && !terminal {
        return true;
    }
    words >= 22 && !terminal
}

// ---------------------------------------------------------------------------
// Refinement acceptance
// ---------------------------------------------------------------------------

/// Truncation heuristic: the refiner's token budget sometimes cuts a
/// rewrite short.  Word-ratio tiers scale with source length; an orphan
/// conjunction ending or a large character drop also reject.
pub fn is_suspiciously_short_refinement(source: &str, candidate: &str) -> bool {
    let source_words = source.split_whitespace().count();
    let candidate_words = candidate.split_whitespace().count();
    if source_words == 0 || candidate_words == 0 {
        return false;
    }

    let ratio = candidate_words as f32 / source_words as f32;
    let ratio_drop = if source_words >= 32 {
        ratio < 0.60
    } else if source_words >= 20 {
        ratio < 0.50
    } else if source_words >= 12 {
        ratio < 0.40
    } else {
        false
    };
    if ratio_drop {
        return true;
    }

    if ends_with_orphan_conjunction(candidate) && !ends_with_orphan_conjunction(source) {
        return true;
    }

    if source_words >= 24 {
        let source_chars = source.chars().count() as f32;
        let candidate_chars = candidate.chars().count() as f32;
        if candidate_chars < 0.70 * source_chars {
            return true;
        }
    }
    false
}

/// Programmer-mode intent guard: a rewrite must not invent or multiply
/// file targets.
pub fn is_suspicious_intent(source: &str, candidate: &str) -> bool {
    if BARE_TAG_SENTENCE_RE.is_match(candidate.trim()) {
        return true;
    }

    let source_files = FILE_TOKEN_RE.find_iter(source).count();
    let candidate_files = FILE_TOKEN_RE.find_iter(candidate).count();
    if source_files == 1 && candidate_files > 1 {
        return true;
    }

    if EDIT_ACTION_START_RE.is_match(source)
        && !source.to_lowercase().contains(" to ")
        && candidate_files >= 2
    {
        return true;
    }
    false
}

// ---------------------------------------------------------------------------
// Completeness preservation
// ---------------------------------------------------------------------------

/// Word-count floor relative to raw below which cleanup is suspected of
/// eating content.
const COMPLETENESS_RATIO: f32 = 0.78;
/// Severe-drop ratio that triggers the fallback even without an orphan
/// ending.
const SEVERE_DROP_RATIO: f32 = 0.55;
/// Raw transcripts shorter than this are never rescued — aggressive
/// cleanup of short utterances is intended.
const COMPLETENESS_MIN_RAW_WORDS: usize = 24;

/// When the full clean dropped too much of a long dictation, rerun the
/// conservative clean and keep whichever output is longer.
///
/// Correction cues exempt the transcript: self-correction rewriting is
/// *supposed* to shrink it.
pub fn preserve_completeness(
    raw: &str,
    cleaned: &str,
    dictionary: &HashMap<String, String>,
    programmer_mode: bool,
) -> String {
    let raw_words = raw.split_whitespace().count();
    let cleaned_words = cleaned.split_whitespace().count();

    if raw_words < COMPLETENESS_MIN_RAW_WORDS {
        return cleaned.to_string();
    }
    if cleaned_words as f32 >= COMPLETENESS_RATIO * raw_words as f32 {
        return cleaned.to_string();
    }
    if has_strong_correction_cue(raw) {
        return cleaned.to_string();
    }
    let severe = (cleaned_words as f32) < SEVERE_DROP_RATIO * raw_words as f32;
    if !severe && !ends_with_orphan_conjunction(cleaned) {
        return cleaned.to_string();
    }

    let conservative = clean_conservative(raw, dictionary, programmer_mode);
    if conservative.split_whitespace().count() > cleaned_words {
        log::info!("Completeness fallback kept the conservative clean");
        conservative
    } else {
        cleaned.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

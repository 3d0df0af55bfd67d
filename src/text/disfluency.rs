//! Disfluency removal: fillers, hesitations, repetitions.
//!
//! These passes run before any structural rewriting.  They must stay
//! conservative — dropping a filler is cheap, dropping content is not.

use once_cell::sync::Lazy;
use regex::Regex;

use super::segment::{normalize_fragment, split_clauses, split_sentences, split_soft_clauses};

static FILLER_WORDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(um+|uh+|hmm+|hm+|ah+|eh+|er+|oh+)\b").unwrap());
static FILLER_PHRASES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(so yeah|and yeah|yeah so|right so)\b[.,]?").unwrap());
static DISCOURSE_FILLER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i),?\s*\b(you know|sort of|kind of|basically|literally)\b\s*,?").unwrap()
});
static INLINE_DISCOURSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:we can see|you can see|we'?ll see|let'?s see)\b").unwrap());
static HESITATION_CHAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:i don't know|i do not know)\s+(?:yeah\s+)?maybe\b").unwrap()
});
static LEADING_DISCOURSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:(?:okay|ok|well|so)\s*,?\s*)+").unwrap());
static LOW_INFO_FRAGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:okay|ok|yeah|right|you know|i mean|let'?s see|we can see|you can see|we'?ll see|i guess|i don't know|i do not know)$",
    )
    .unwrap()
});

/// Remove standalone filler words and filler phrases.
pub fn remove_fillers(text: &str) -> String {
    let text = FILLER_WORDS_RE.replace_all(text, "");
    FILLER_PHRASES_RE.replace_all(&text, "").into_owned()
}

/// Strip leading discourse markers ("okay", "well", "so", chained).
pub fn strip_leading_discourse(text: &str) -> String {
    LEADING_DISCOURSE_RE.replace(text, "").into_owned()
}

/// Replace inline discourse fragments ("we can see") with a space.
pub fn remove_inline_discourse(text: &str) -> String {
    INLINE_DISCOURSE_RE.replace_all(text, " ").into_owned()
}

/// Collapse hesitation chains ("i don't know yeah maybe" → "maybe").
pub fn collapse_hesitation_chains(text: &str) -> String {
    HESITATION_CHAIN_RE.replace_all(text, "maybe").into_owned()
}

/// Remove mid-sentence discourse fillers ("you know", "basically", ...).
pub fn remove_discourse_fillers(text: &str) -> String {
    DISCOURSE_FILLER_RE.replace_all(text, " ").into_owned()
}

/// Drop standalone `yeah` / `yep` tokens; their trailing punctuation stays
/// (a later tidy pass re-attaches it).
pub fn remove_yeah_tokens(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        let core = token.trim_end_matches(|c: char| ",.!?;:".contains(c));
        let lowered = core.to_lowercase();
        if lowered == "yeah" || lowered == "yep" {
            let punct = &token[core.len()..];
            if !punct.is_empty() {
                out.push(punct.to_string());
            }
            continue;
        }
        out.push(token.to_string());
    }
    out.join(" ")
}

/// Collapse immediate word repetitions (`the the` → `the`).
///
/// `no no` is preserved: it is the strongest self-correction cue and the
/// correction pass runs later.  When the repeated run carries trailing
/// punctuation on its last token, the survivor inherits it.
pub fn dedupe_repeated_words(text: &str) -> String {
    fn core_of(token: &str) -> &str {
        token.trim_end_matches(|c: char| ",.!?;:".contains(c))
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let core = core_of(tokens[i]);
        if core.is_empty() || !core.chars().all(|c| c.is_alphanumeric() || c == '_') {
            out.push(tokens[i].to_string());
            i += 1;
            continue;
        }

        let lowered = core.to_lowercase();
        let mut run_end = i;
        // A repetition run continues while the next token has the same core
        // and the current token carries no punctuation (punctuation breaks
        // the run, as in "stop. stop").
        while run_end + 1 < tokens.len()
            && core_of(tokens[run_end]).len() == tokens[run_end].len()
            && core_of(tokens[run_end + 1]).to_lowercase() == lowered
        {
            run_end += 1;
        }

        if run_end > i && lowered != "no" {
            let mut survivor = core_of(tokens[i]).to_string();
            let last = tokens[run_end];
            survivor.push_str(&last[core_of(last).len()..]);
            out.push(survivor);
        } else {
            for token in &tokens[i..=run_end] {
                out.push(token.to_string());
            }
        }
        i = run_end + 1;
    }

    out.join(" ")
}

/// Collapse immediately repeated clauses (a common ASR loop artifact).
///
/// Exact repeats of 3+ words are dropped; a clause of 6+ words that is the
/// exact tail of the previous clause is dropped too.
pub fn collapse_repeated_clauses(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut prev_norm = String::new();

    for chunk in split_clauses(text.trim()) {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        let body = chunk
            .trim_end_matches(|c: char| ".!?;:".contains(c))
            .trim();
        if body.is_empty() {
            continue;
        }
        let norm = normalize_fragment(body);
        let word_count = norm.split_whitespace().count();
        if norm == prev_norm && word_count >= 3 {
            continue;
        }
        if !prev_norm.is_empty() && word_count >= 6 && prev_norm.ends_with(&norm) {
            continue;
        }
        out.push(chunk.to_string());
        prev_norm = norm;
    }

    if out.is_empty() {
        text.to_string()
    } else {
        out.join(" ")
    }
}

/// Drop duplicated adjacent sentences (6+ words) while preserving order.
pub fn dedupe_adjacent_sentences(text: &str) -> String {
    let chunks: Vec<String> = split_sentences(text.trim())
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if chunks.len() < 2 {
        return text.to_string();
    }

    let mut out: Vec<String> = Vec::new();
    let mut prev_norm = String::new();
    for chunk in chunks {
        let norm = normalize_fragment(&chunk);
        if !norm.is_empty() && norm == prev_norm && norm.split_whitespace().count() >= 6 {
            continue;
        }
        out.push(chunk);
        prev_norm = norm;
    }

    if out.is_empty() {
        text.to_string()
    } else {
        out.join(" ")
    }
}

/// Prune low-information discourse fragments from mixed sentences.
///
/// Only fires when the text still has substantive fragments; a text that is
/// nothing but filler keeps its first fragment.
pub fn prune_low_info_fragments(text: &str) -> String {
    let chunks: Vec<String> = split_soft_clauses(text.trim())
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if chunks.len() < 2 {
        return text.to_string();
    }

    let normalized: Vec<String> = chunks.iter().map(|c| normalize_fragment(c)).collect();
    let substantive = normalized
        .iter()
        .filter(|n| !LOW_INFO_FRAGMENT_RE.is_match(n))
        .count();
    if substantive == 0 {
        return chunks[0].clone();
    }

    let mut out: Vec<String> = Vec::new();
    let mut prev_norm = String::new();
    for (chunk, norm) in chunks.iter().zip(normalized.iter()) {
        if norm.is_empty() || LOW_INFO_FRAGMENT_RE.is_match(norm) || *norm == prev_norm {
            continue;
        }
        out.push(chunk.clone());
        prev_norm = norm.clone();
    }

    if out.is_empty() {
        chunks[0].clone()
    } else {
        out.join(" ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_filler_words() {
        assert_eq!(remove_fillers("um I uh think"), " I  think");
        assert_eq!(remove_fillers("hmm right"), " right");
    }

    #[test]
    fn removes_filler_phrases_with_punctuation() {
        assert_eq!(remove_fillers("so yeah, let's go"), " let's go");
    }

    #[test]
    fn strips_chained_leading_discourse() {
        assert_eq!(strip_leading_discourse("okay so, well now"), "now");
        assert_eq!(strip_leading_discourse("now then"), "now then");
    }

    #[test]
    fn hesitation_chain_collapses_to_maybe() {
        assert_eq!(
            collapse_hesitation_chains("i don't know yeah maybe tomorrow"),
            "maybe tomorrow"
        );
    }

    #[test]
    fn yeah_tokens_are_dropped_but_punctuation_survives() {
        assert_eq!(remove_yeah_tokens("yeah maybe"), "maybe");
        assert_eq!(remove_yeah_tokens("yeah, maybe"), ", maybe");
        assert_eq!(remove_yeah_tokens("yep yep done"), "done");
        assert_eq!(remove_yeah_tokens("yeah-ish plan"), "yeah-ish plan");
    }

    #[test]
    fn discourse_fillers_removed_mid_sentence() {
        let out = remove_discourse_fillers("it is basically done you know");
        assert!(!out.to_lowercase().contains("basically"));
        assert!(!out.to_lowercase().contains("you know"));
    }

    #[test]
    fn repeated_words_are_collapsed() {
        assert_eq!(dedupe_repeated_words("the the parser"), "the parser");
        assert_eq!(dedupe_repeated_words("run run run it"), "run it");
    }

    #[test]
    fn repetition_with_trailing_punctuation_keeps_it() {
        assert_eq!(dedupe_repeated_words("stop the the."), "stop the.");
    }

    #[test]
    fn no_no_is_preserved_for_correction_detection() {
        assert_eq!(dedupe_repeated_words("no no the refiner"), "no no the refiner");
    }

    #[test]
    fn case_insensitive_repetition_keeps_first_spelling() {
        assert_eq!(dedupe_repeated_words("The the parser"), "The parser");
    }

    #[test]
    fn collapses_exact_repeated_clauses() {
        let out =
            collapse_repeated_clauses("we should ship today. we should ship today. we should ship today.");
        assert_eq!(out.to_lowercase(), "we should ship today.");
    }

    #[test]
    fn collapses_clause_that_repeats_previous_tail() {
        let text =
            "The bug appears during long dictation The code is used in the following way. The code is used in the following way.";
        let out = collapse_repeated_clauses(text);
        assert_eq!(
            out.to_lowercase().matches("the code is used in the following way").count(),
            1
        );
    }

    #[test]
    fn short_repeats_are_kept() {
        assert_eq!(collapse_repeated_clauses("go. go."), "go. go.");
    }

    #[test]
    fn dedupes_adjacent_long_sentences() {
        let text = "The code is a little bit different from the previous version. The code is a little bit different from the previous version.";
        let out = dedupe_adjacent_sentences(text);
        assert_eq!(
            out.to_lowercase()
                .matches("the code is a little bit different")
                .count(),
            1
        );
    }

    #[test]
    fn prunes_low_info_fragments_next_to_content() {
        let out = prune_low_info_fragments("we can see, let's see, this should remain now");
        assert!(!out.to_lowercase().contains("we can see"));
        assert!(!out.to_lowercase().contains("let's see"));
        assert!(out.contains("this should remain now"));
    }

    #[test]
    fn pure_filler_text_keeps_first_fragment() {
        assert_eq!(prune_low_info_fragments("okay, yeah, right"), "okay,");
    }
}

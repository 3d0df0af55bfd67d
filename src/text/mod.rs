//! Deterministic transcript cleaner.
//!
//! [`clean`] is a pure function of `(raw_text, dictionary, programmer_mode)`
//! and runs in well under a millisecond — it is applied to every
//! transcript, before and after any LLM involvement, so its rules always
//! win.  [`clean_conservative`] is the completeness fallback: the same
//! passes minus self-correction rewriting and clause collapsing, used when
//! the full clean dropped too much of a long dictation.
//!
//! Pass order matters and mirrors the pipeline stages: disfluency removal →
//! acronyms → dictionary → self-corrections → structural dedupe →
//! programmer tags → readability → whitespace/punctuation tidy-up.

pub mod corrections;
pub mod disfluency;
pub mod readability;
pub mod segment;
pub mod tagging;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

pub use corrections::has_correction_cue;
pub use segment::{ends_with_orphan_conjunction, has_terminal_punctuation};

static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());
static SPACE_BEFORE_PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([.,!?;:])").unwrap());
static COMMA_BEFORE_TERMINAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",([.!?])").unwrap());
static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*$").unwrap());
static LEADING_COMMA_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[,\s]+").unwrap());

/// Full cleanup: all transformations.
pub fn clean(text: &str, dictionary: &HashMap<String, String>, programmer_mode: bool) -> String {
    clean_inner(text, dictionary, programmer_mode, true)
}

/// Conservative cleanup: skips self-correction rewriting and clause
/// collapsing so long dictation keeps its full content.
pub fn clean_conservative(
    text: &str,
    dictionary: &HashMap<String, String>,
    programmer_mode: bool,
) -> String {
    clean_inner(text, dictionary, programmer_mode, false)
}

fn clean_inner(
    text: &str,
    dictionary: &HashMap<String, String>,
    programmer_mode: bool,
    rewrite_corrections: bool,
) -> String {
    let mut text = disfluency::remove_fillers(text);
    text = disfluency::strip_leading_discourse(&text);
    text = disfluency::remove_inline_discourse(&text);
    text = disfluency::collapse_hesitation_chains(&text);
    text = disfluency::remove_yeah_tokens(&text);
    text = disfluency::remove_discourse_fillers(&text);
    text = disfluency::dedupe_repeated_words(&text);
    text = tagging::normalize_spoken_acronyms(&text);
    text = apply_dictionary(&text, dictionary);

    if rewrite_corrections {
        text = corrections::apply_self_corrections(&text);
        text = disfluency::collapse_repeated_clauses(&text);
    }
    text = disfluency::dedupe_adjacent_sentences(&text);
    text = disfluency::prune_low_info_fragments(&text);

    if programmer_mode {
        text = tagging::tag_file_mentions(&text);
        text = tagging::tag_symbol_mentions(&text);
    }

    text = readability::normalize_readability(&text);
    tidy(&text)
}

/// Apply dictionary replacements case-insensitively, longest key first so a
/// short key never masks a longer one.
fn apply_dictionary(text: &str, dictionary: &HashMap<String, String>) -> String {
    if dictionary.is_empty() {
        return text.to_string();
    }

    let mut keys: Vec<&String> = dictionary.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut text = text.to_string();
    for key in keys {
        // Word-boundary anchors keep `oop` from rewriting the middle of
        // `loop`; only added where the key edge is a word character.
        let mut pattern = String::from("(?i)");
        if key.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            pattern.push_str(r"\b");
        }
        pattern.push_str(&regex::escape(key));
        if key.ends_with(|c: char| c.is_alphanumeric() || c == '_') {
            pattern.push_str(r"\b");
        }
        let pattern = match Regex::new(&pattern) {
            Ok(p) => p,
            Err(_) => continue,
        };
        text = pattern
            .replace_all(&text, NoExpand(dictionary[key].as_str()))
            .into_owned();
    }
    text
}

/// Whitespace and punctuation tidy-up after all content passes.
fn tidy(text: &str) -> String {
    let text = MULTI_SPACE_RE.replace_all(text, " ");
    let text = SPACE_BEFORE_PUNCT_RE.replace_all(&text, "$1");
    let text = COMMA_BEFORE_TERMINAL_RE.replace_all(&text, "$1");
    let text = TRAILING_COMMA_RE.replace(&text, "");
    let text = LEADING_COMMA_WS_RE.replace(&text, "");
    text.trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn no_dict() -> HashMap<String, String> {
        HashMap::new()
    }

    fn dict(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ---- Self-corrections --------------------------------------------------

    #[test]
    fn no_no_correction_preserves_sentence_context() {
        let cleaned = clean(
            "okay we have a problem in the app i want to modify functions file no no modify text refiner file",
            &no_dict(),
            true,
        );
        let lower = cleaned.to_lowercase();
        assert!(lower.contains("we have a problem in the app"));
        assert!(lower.contains("i want to modify"));
        assert!(lower.contains("@text_refiner"));
        assert!(!lower.contains("@functions"));
    }

    #[test]
    fn single_no_statement_does_not_replace_previous_sentence() {
        let cleaned = clean(
            "we should enable this for all users. no we don't want that yet.",
            &no_dict(),
            true,
        );
        let lower = cleaned.to_lowercase();
        assert!(lower.contains("we should enable this for all users"));
        assert!(lower.contains("we don't want that yet"));
    }

    #[test]
    fn weak_sorry_cue_preserves_context_when_not_edit_command() {
        let cleaned = clean(
            "the app is stable in staging. sorry we still need to test payments.",
            &no_dict(),
            true,
        );
        let lower = cleaned.to_lowercase();
        assert!(lower.contains("the app is stable in staging"));
        assert!(lower.contains("we still need to test payments"));
    }

    #[test]
    fn backtracked_edit_command_is_rewritten() {
        let cleaned = clean("change it to red, sorry blue please", &no_dict(), true);
        let lower = cleaned.to_lowercase();
        assert!(lower.contains("blue"));
        assert!(!lower.contains("red"));
    }

    // ---- Conservative mode -------------------------------------------------

    #[test]
    fn clean_conservative_keeps_context_without_replacement() {
        let cleaned = clean_conservative(
            "we should enable this for all users no wait not all users yet",
            &no_dict(),
            true,
        );
        let lower = cleaned.to_lowercase();
        assert!(lower.contains("we should enable this for all users"));
        assert!(lower.contains("not all users yet"));
    }

    #[test]
    fn clean_conservative_still_removes_fillers() {
        let cleaned = clean_conservative("um we should uh ship it basically now", &no_dict(), true);
        let lower = cleaned.to_lowercase();
        assert!(!lower.contains("um"));
        assert!(!lower.contains("basically"));
        assert!(lower.contains("we should ship it now"));
    }

    // ---- File tagging ------------------------------------------------------

    #[test]
    fn tags_explicit_and_spoken_file_names() {
        let explicit = clean("please update function.py file", &no_dict(), true);
        let spoken = clean("please update function dot py file", &no_dict(), true);
        assert!(explicit.contains("@function.py"));
        assert!(spoken.contains("@function.py"));
    }

    #[test]
    fn tags_spoken_dmg_filename() {
        let cleaned = clean("please update voiceflow dot dmg file", &no_dict(), true);
        assert!(cleaned.to_lowercase().contains("@voiceflow.dmg"));
    }

    #[test]
    fn does_not_tag_bare_extension_as_file() {
        let cleaned = clean("please update dmg file", &no_dict(), true);
        assert!(!cleaned.to_lowercase().contains("@dmg"));
        assert!(cleaned.to_lowercase().contains("dmg file"));
    }

    #[test]
    fn sanitizes_lone_extension_tag() {
        let cleaned = clean("please update the voiceflow @dmg release", &no_dict(), true);
        assert!(!cleaned.to_lowercase().contains("@dmg"));
        assert!(cleaned.to_lowercase().contains("dmg"));
    }

    #[test]
    fn spoken_complex_filenames_are_tagged() {
        let cleaned = clean(
            "update text underscore refiner dot py and docker dash compose dot yml",
            &no_dict(),
            true,
        )
        .to_lowercase();
        assert!(cleaned.contains("@text_refiner.py"));
        assert!(cleaned.contains("@docker-compose.yml"));
    }

    #[test]
    fn merges_fragmented_filename_tags() {
        let cleaned = clean(
            "update text underscore @refiner.py and @docker-@compose.yml",
            &no_dict(),
            true,
        )
        .to_lowercase();
        assert!(cleaned.contains("@text_refiner.py"));
        assert!(cleaned.contains("@docker-compose.yml"));
    }

    #[test]
    fn merges_prefixed_tagged_filename_after_rename_verb() {
        let cleaned = clean("then rename release notes.md to release-notes.md", &no_dict(), true)
            .to_lowercase();
        assert!(!cleaned.contains("release @notes.md"));
        assert!(cleaned.contains("rename @release-notes.md to @release-notes.md"));
    }

    #[test]
    fn does_not_tag_framework_terms_as_files() {
        let cleaned = clean("technical terms like next.js and plate.js", &no_dict(), true);
        assert!(!cleaned.to_lowercase().contains("@next.js"));
        assert!(!cleaned.to_lowercase().contains("@plate.js"));
    }

    #[test]
    fn untags_framework_list_with_existing_prefixes() {
        let cleaned = clean(
            "technical terms like @next.js, @play.js and @plate.js",
            &no_dict(),
            true,
        );
        assert!(cleaned
            .to_lowercase()
            .contains("technical terms like next.js, play.js and plate.js"));
        assert!(!cleaned.contains('@'));
    }

    #[test]
    fn normal_mode_skips_file_tagging() {
        let cleaned = clean("please update function.py file", &no_dict(), false);
        assert!(!cleaned.to_lowercase().contains("@function.py"));
        assert!(cleaned.to_lowercase().contains("function.py"));
    }

    #[test]
    fn bare_generic_file_reference_is_not_tagged() {
        let cleaned = clean("please open the file", &no_dict(), true);
        assert_eq!(cleaned.to_lowercase(), "please open the file");
    }

    // ---- Symbol tagging ----------------------------------------------------

    #[test]
    fn programmer_mode_tags_symbol_mentions() {
        let cleaned = clean("please refactor function parse_request", &no_dict(), true);
        assert!(cleaned.contains("@parse_request"));
    }

    #[test]
    fn normal_mode_skips_symbol_tagging() {
        let cleaned = clean("please refactor function parse_request", &no_dict(), false);
        assert!(!cleaned.contains("@parse_request"));
    }

    // ---- Dictionary --------------------------------------------------------

    #[test]
    fn dictionary_applies_case_insensitively() {
        let cleaned = clean(
            "the React Dom update is ready",
            &dict(&[("react dom", "ReactDOM")]),
            true,
        );
        assert!(cleaned.contains("ReactDOM"));
    }

    #[test]
    fn longer_dictionary_keys_win_over_prefixes() {
        let cleaned = clean(
            "check the plate js editor config",
            &dict(&[("plate", "Plate"), ("plate js", "Plate.js")]),
            true,
        );
        assert!(cleaned.contains("Plate.js"));
        assert!(!cleaned.contains("Plate.js js"));
    }

    #[test]
    fn dictionary_replacement_respects_word_boundaries() {
        let cleaned = clean(
            "run the loop over every oop example",
            &dict(&[("oop", "OOP")]),
            true,
        );
        assert!(cleaned.contains("loop"));
        assert!(cleaned.contains("OOP"));
        assert!(!cleaned.contains("lOOP"));
    }

    #[test]
    fn question_with_acronym_is_normalized() {
        let cleaned = clean("what is polymorphism in oop", &dict(&[("oop", "OOP")]), true);
        assert_eq!(cleaned, "What is polymorphism in OOP?");
    }

    #[test]
    fn short_technical_phrase_rescues_js_homophone() {
        let cleaned = clean(
            "please update plate chess file",
            &dict(&[("plate js", "Plate.js")]),
            true,
        );
        assert!(cleaned.contains("Plate.js"));
    }

    #[test]
    fn js_homophone_not_applied_to_plain_chess_sentence() {
        let cleaned = clean("we should play chess later", &no_dict(), true);
        assert_eq!(cleaned.to_lowercase(), "we should play chess later");
    }

    // ---- Structural dedupe -------------------------------------------------

    #[test]
    fn collapses_repeated_clauses() {
        let cleaned = clean(
            "we should ship today. we should ship today. we should ship today.",
            &no_dict(),
            true,
        );
        assert_eq!(cleaned.to_lowercase(), "we should ship today.");
    }

    #[test]
    fn dedupes_adjacent_long_sentences() {
        let cleaned = clean(
            "The code is a little bit different from the code that we have used in the previous version. \
             The code is a little bit different from the code that we have used in the previous version.",
            &no_dict(),
            true,
        );
        assert_eq!(
            cleaned
                .to_lowercase()
                .matches("the code is a little bit different from the code that we have used in the previous version")
                .count(),
            1
        );
    }

    #[test]
    fn dedupes_repeated_tail_sentence_after_longer_clause() {
        let cleaned = clean(
            "The bug appears during long dictation The code is used in the following way. \
             The code is used in the following way.",
            &no_dict(),
            true,
        )
        .to_lowercase();
        assert_eq!(cleaned.matches("the code is used in the following way").count(), 1);
        assert!(cleaned.contains("long dictation. the code is used"));
    }

    #[test]
    fn prunes_low_information_repetition_in_sentence() {
        let cleaned = clean(
            "we can see, let's see, this should remain in the same sentence now",
            &no_dict(),
            true,
        )
        .to_lowercase();
        assert!(!cleaned.contains("we can see"));
        assert!(!cleaned.contains("let's see"));
        assert!(cleaned.contains("this should remain in the same sentence now"));
    }

    // ---- Readability -------------------------------------------------------

    #[test]
    fn normalize_readability_adds_sentence_case_and_punctuation() {
        let cleaned = clean(
            "okay now i'm just testing this and we should verify output",
            &no_dict(),
            true,
        );
        assert!(cleaned.starts_with("Now I'm"));
        assert!(cleaned.ends_with('.'));
    }

    #[test]
    fn trailing_conjunction_is_removed_before_period() {
        let cleaned = clean("now we should deploy but", &no_dict(), true);
        assert_eq!(cleaned, "Now we should deploy");
    }

    #[test]
    fn embedded_should_question_is_made_explicit() {
        let cleaned = clean(
            "if i ask should we ship today or wait for one more smoke test keep it as a question and do not answer it",
            &no_dict(),
            true,
        );
        assert!(cleaned
            .to_lowercase()
            .contains("if i ask, should we ship today or wait for one more smoke test?"));
    }

    // ---- Idempotence -------------------------------------------------------

    #[test]
    fn clean_is_idempotent_on_typical_transcripts() {
        let samples = [
            "okay we have a problem in the app i want to modify functions file no no modify text refiner file",
            "please update function dot py file",
            "um I uh think we should basically ship it now you know",
            "we should ship today. we should ship today.",
            "please refactor function parse_request",
            "what is polymorphism in oop",
            "update text underscore refiner dot py and docker dash compose dot yml",
        ];
        for sample in samples {
            let once = clean(sample, &no_dict(), true);
            let twice = clean(&once, &no_dict(), true);
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(clean("", &no_dict(), true), "");
        assert_eq!(clean("   ", &no_dict(), true), "");
    }
}

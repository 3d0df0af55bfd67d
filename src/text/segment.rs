//! Sentence and clause segmentation shared across the cleaner passes.
//!
//! The splitters mirror lookbehind-style splitting (`(?<=[.!?])\s+`): the
//! punctuation stays attached to the fragment before the whitespace.

/// Punctuation that ends a sentence.
const SENTENCE_ENDS: &[char] = &['.', '!', '?'];
/// Punctuation that ends a hard clause.
const HARD_CLAUSE_ENDS: &[char] = &['.', '!', '?', ';', ':'];
/// Punctuation that ends a soft clause (commas included).
const SOFT_CLAUSE_ENDS: &[char] = &[',', '.', '!', '?', ';', ':'];

fn split_after(text: &str, ends: &[char]) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if ends.contains(&ch) && chars.peek().is_some_and(|next| next.is_whitespace()) {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
            parts.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Split into sentences after `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    split_after(text, SENTENCE_ENDS)
}

/// Split into clauses after `.`, `!`, `?`, `;` or `:`.
pub fn split_clauses(text: &str) -> Vec<String> {
    split_after(text, HARD_CLAUSE_ENDS)
}

/// Split into soft clauses — commas count as boundaries too.
pub fn split_soft_clauses(text: &str) -> Vec<String> {
    split_after(text, SOFT_CLAUSE_ENDS)
}

/// Lowercase a fragment and strip edge whitespace/punctuation so fragments
/// can be compared for duplication.
pub fn normalize_fragment(text: &str) -> String {
    let trimmed = text
        .trim_matches(|c: char| c.is_whitespace() || ",;:.!?-".contains(c))
        .to_lowercase();
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether the text ends with terminal punctuation (optionally followed by
/// a closing quote/bracket).
pub fn has_terminal_punctuation(text: &str) -> bool {
    let trimmed = text.trim_end();
    let mut chars = trimmed.chars().rev();
    let Some(last) = chars.next() else {
        return false;
    };
    if SENTENCE_ENDS.contains(&last) {
        return true;
    }
    if "\"')]".contains(last) {
        if let Some(prev) = chars.next() {
            return SENTENCE_ENDS.contains(&prev);
        }
    }
    false
}

/// English and German interrogative openers.  `was` doubles as German
/// "what" — acceptable overlap with the English past tense, the gate only
/// becomes more conservative.
const QUESTION_STARTERS: &[&str] = &[
    "who", "what", "when", "where", "why", "how", "is", "are", "am", "was", "were", "do", "does",
    "did", "can", "could", "should", "would", "will", "which", "whose", "whom", "what's", "whats",
    "isn't", "aren't", "won't", "can't", "couldn't", "shouldn't", "wouldn't", "wer", "wann", "wo",
    "warum", "wie", "ist", "sind", "bin", "war", "waren", "kann", "kannst", "können", "soll",
    "sollte", "würde", "hat", "haben", "gibt", "gibt's",
];

/// Whether the first word is an interrogative opener.
pub fn starts_with_question_word(text: &str) -> bool {
    match text.trim_start().split_whitespace().next() {
        Some(first) => {
            let first = first
                .trim_end_matches(|c: char| ",.!?;:".contains(c))
                .to_lowercase();
            QUESTION_STARTERS.contains(&first.as_str())
        }
        None => false,
    }
}

/// Question-shaped: ends with `?` or starts with a question word.
pub fn looks_like_question(text: &str) -> bool {
    text.trim_end().ends_with('?') || starts_with_question_word(text)
}

/// Connectives that indicate mid-thought truncation when a text ends with
/// one of them.
const ORPHAN_CONJUNCTIONS: &[&str] = &["and", "or", "but", "so", "because", "then"];

/// Whether the text ends in a dangling connective ("... and").
pub fn ends_with_orphan_conjunction(text: &str) -> bool {
    let trimmed = text
        .trim_end()
        .trim_end_matches(|c: char| ",;:.!?".contains(c));
    match trimmed.rsplit(char::is_whitespace).next() {
        Some(last) => ORPHAN_CONJUNCTIONS.contains(&last.to_lowercase().as_str()),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sentences_and_keeps_punctuation() {
        let parts = split_sentences("First one. Second one! Third?");
        assert_eq!(parts, vec!["First one.", "Second one!", "Third?"]);
    }

    #[test]
    fn no_boundary_yields_single_part() {
        assert_eq!(split_sentences("no punctuation here"), vec!["no punctuation here"]);
    }

    #[test]
    fn punctuation_without_space_does_not_split() {
        assert_eq!(split_sentences("file.py is open"), vec!["file.py is open"]);
    }

    #[test]
    fn clause_split_includes_semicolons() {
        let parts = split_clauses("first; second: third");
        assert_eq!(parts, vec!["first;", "second:", "third"]);
    }

    #[test]
    fn soft_clause_split_includes_commas() {
        let parts = split_soft_clauses("okay, let's see, real content");
        assert_eq!(parts, vec!["okay,", "let's see,", "real content"]);
    }

    #[test]
    fn normalize_fragment_strips_edges_and_case() {
        assert_eq!(normalize_fragment("  Okay, sure!  "), "okay, sure");
        assert_eq!(normalize_fragment("We   Can see."), "we can see");
    }

    #[test]
    fn terminal_punctuation_detection() {
        assert!(has_terminal_punctuation("Done."));
        assert!(has_terminal_punctuation("Really?"));
        assert!(has_terminal_punctuation("He said \"go.\""));
        assert!(!has_terminal_punctuation("Done"));
        assert!(!has_terminal_punctuation("trailing, "));
        assert!(!has_terminal_punctuation(""));
    }

    #[test]
    fn question_word_detection() {
        assert!(starts_with_question_word("what is polymorphism"));
        assert!(starts_with_question_word("Wie kann ich das testen"));
        assert!(!starts_with_question_word("update the parser"));
        assert!(!starts_with_question_word(""));
    }

    #[test]
    fn question_shape_detection() {
        assert!(looks_like_question("ship it today?"));
        assert!(looks_like_question("how do I reset my key"));
        assert!(!looks_like_question("ship it today."));
    }

    #[test]
    fn orphan_conjunction_detection() {
        assert!(ends_with_orphan_conjunction("we should deploy and"));
        assert!(ends_with_orphan_conjunction("we should deploy and."));
        assert!(ends_with_orphan_conjunction("keep going BECAUSE"));
        assert!(!ends_with_orphan_conjunction("we should deploy"));
        assert!(!ends_with_orphan_conjunction(""));
    }
}

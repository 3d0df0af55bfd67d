//! Spoken-acronym normalization plus file and symbol tagging.
//!
//! Programmer mode turns dictated file mentions into `@`-style tags that
//! coding assistants resolve against the workspace: explicit names
//! (`parser.py`), spoken forms (`parser dot py`, `text underscore refiner
//! dot py`), and bare `<name> file` phrases.  Framework names like
//! `next.js` are vocabulary, not files, and are never tagged.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Extensions that qualify a token as a file name.
const FILE_EXTS: &[&str] = &[
    "py", "js", "jsx", "ts", "tsx", "java", "go", "rs", "rb", "php", "swift", "kt", "c", "h",
    "hpp", "cpp", "m", "mm", "cs", "json", "yaml", "yml", "toml", "ini", "env", "md", "txt",
    "sql", "sh", "bash", "zsh", "html", "htm", "css", "scss", "vue", "dmg",
];

/// Words that must not begin a bare `<name> file` base.
const BARE_FILE_START_BLOCK: &[&str] = &[
    "a", "an", "the", "this", "that", "my", "your", "our", "their", "open", "close", "read",
    "write", "save", "edit", "modify", "update", "change", "fix", "move", "rename", "create",
    "delete", "remove", "use", "call", "set", "switch", "want", "need", "have", "is", "are",
    "was", "were", "please", "just", "to",
];

/// Bases too generic to be a file name on their own.
const GENERIC_FILE_BASES: &[&str] = &[
    "a", "an", "the", "this", "that", "it", "my", "your", "our", "their",
];

/// Framework vocabulary that looks like a file name but never is one.
const FRAMEWORK_FILE_TOKENS: &[&str] = &[
    "next.js", "node.js", "react.js", "plate.js", "vue.js", "nuxt.js", "solid.js", "svelte.js",
    "express.js",
];

/// Words that make a spoken `<base> chess` a JS homophone worth fixing.
const JS_CONTEXT_HINTS: &[&str] = &[
    "next", "react", "node", "express", "nest", "vite", "vue", "nuxt", "remix", "solid", "plate",
];

/// Names too generic to tag as symbols.
const GENERIC_SYMBOLS: &[&str] = &[
    "code", "file", "app", "function", "class", "module", "variable", "type", "interface",
];

fn ext_alternation() -> String {
    FILE_EXTS.join("|")
}

static EXPLICIT_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(^|[^\w@])(?P<name>[A-Za-z0-9][A-Za-z0-9_./-]*\.(?:{exts}))\b(?:\s+file\b)?",
        exts = ext_alternation()
    ))
    .unwrap()
});
static SPOKEN_DOT_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(^|[^\w@])(?P<base>[A-Za-z0-9][A-Za-z0-9_-]*)\s+dot\s+(?P<ext>{exts})\b(?:\s+file\b)?",
        exts = ext_alternation()
    ))
    .unwrap()
});
static SPOKEN_COMPLEX_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(^|[^\w@])(?P<base>[A-Za-z0-9][A-Za-z0-9_-]*(?:\s+(?:underscore|under score|dash|hyphen)\s+[A-Za-z0-9][A-Za-z0-9_-]*)+)\s+dot\s+(?P<ext>{exts})\b(?:\s+file\b)?",
        exts = ext_alternation()
    ))
    .unwrap()
});
static BARE_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|[^@\w])(?P<base>[A-Za-z][A-Za-z0-9_-]*(?:\s+[A-Za-z0-9_-]+)?)\s+file\b")
        .unwrap()
});
static DUPLICATE_FILE_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\s*@\s*").unwrap());
static LONE_EXTENSION_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(^|[^\w])@(?P<ext>{exts})\b",
        exts = ext_alternation()
    ))
    .unwrap()
});
static FRAGMENTED_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)@(?P<left>[A-Za-z0-9_-]+)(?P<sep>[-_])@(?P<right>[A-Za-z0-9_-]+\.(?:{exts}))\b",
        exts = ext_alternation()
    ))
    .unwrap()
});
static SPOKEN_FRAGMENTED_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(^|[^@\w])(?P<left>[A-Za-z0-9_-]+)\s+(?P<sep>underscore|under score|dash|hyphen)\s+@(?P<right>[A-Za-z0-9_-]+\.(?:{exts}))\b",
        exts = ext_alternation()
    ))
    .unwrap()
});
static VERB_PREFIX_TAG_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<verb>rename|update|modify|edit|open|create|delete|move|copy)\s+(?P<middle>(?:(?:the|this|that)\s+)?(?:file\s+)?)?(?P<prefix>[A-Za-z0-9_-]{{2,}})\s+@(?P<name>[A-Za-z0-9_-]+\.(?:{exts}))\b",
        exts = ext_alternation()
    ))
    .unwrap()
});
static TAGGED_JS_LIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?P<prefix>\b(?:terms?|libraries|frameworks?)\s+like\s+)(?P<body>@[A-Za-z0-9_-]+\.(?:js|jsx|ts|tsx)\b(?:\s*,\s*@[A-Za-z0-9_-]+\.(?:js|jsx|ts|tsx)\b)*(?:\s+and\s+@[A-Za-z0-9_-]+\.(?:js|jsx|ts|tsx)\b)?)",
    )
    .unwrap()
});
static SYMBOL_MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?P<verb>update|modify|refactor|fix|rename|call|use|create|open|check|test)\s+(?:the\s+)?(?P<kind>function|method|class|module|variable|interface|type)\s+(?P<name>[A-Za-z_][A-Za-z0-9_.:-]{1,64})\b",
    )
    .unwrap()
});
static SYMBOL_FILE_EXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\.(?:{exts})$", exts = ext_alternation())).unwrap()
});
static SPELLED_JS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(jay\s+ess|j\s*\.?\s*s)\b").unwrap());
static SPELLED_TS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(tea\s+ess|t\s*\.?\s*s)\b").unwrap());
static JS_HOMOPHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?P<base>[A-Za-z][A-Za-z0-9_-]*)\s+chess\b").unwrap());
static UNDERSCORE_SEP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:underscore|under score)\s+").unwrap());
static DASH_SEP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+(?:dash|hyphen)\s+").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ---------------------------------------------------------------------------
// Spoken acronyms
// ---------------------------------------------------------------------------

/// `jay ess` / `j s` → `JS`, `tea ess` / `t s` → `TS`, and the
/// `<framework> chess` homophone → `<framework> JS`.
pub fn normalize_spoken_acronyms(text: &str) -> String {
    let text = SPELLED_JS_RE.replace_all(text, "JS");
    let text = SPELLED_TS_RE.replace_all(&text, "TS");
    JS_HOMOPHONE_RE
        .replace_all(&text, |caps: &Captures| {
            let base = caps.name("base").unwrap().as_str();
            if JS_CONTEXT_HINTS.contains(&base.to_lowercase().as_str()) {
                format!("{base} JS")
            } else {
                caps.get(0).unwrap().as_str().to_string()
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// File tagging
// ---------------------------------------------------------------------------

/// Turn spoken or explicit file mentions into `@`-style file tags.
pub fn tag_file_mentions(text: &str) -> String {
    let text = SPOKEN_COMPLEX_FILE_RE.replace_all(text, |caps: &Captures| {
        let base = caps.name("base").unwrap().as_str().trim();
        let ext = caps.name("ext").unwrap().as_str().to_lowercase();
        let base = UNDERSCORE_SEP_RE.replace_all(base, "_");
        let base = DASH_SEP_RE.replace_all(&base, "-");
        let base = WS_RE.replace_all(&base, "_");
        format!("{}@{base}.{ext}", &caps[1])
    });

    let text = SPOKEN_DOT_FILE_RE.replace_all(&text, |caps: &Captures| {
        format!(
            "{}@{}.{}",
            &caps[1],
            caps.name("base").unwrap().as_str(),
            caps.name("ext").unwrap().as_str().to_lowercase()
        )
    });

    let text = EXPLICIT_FILE_RE.replace_all(&text, |caps: &Captures| {
        let name = caps.name("name").unwrap().as_str();
        if FRAMEWORK_FILE_TOKENS.contains(&name.to_lowercase().as_str()) {
            format!("{}{name}", &caps[1])
        } else {
            format!("{}@{name}", &caps[1])
        }
    });

    let text = BARE_FILE_RE.replace_all(&text, |caps: &Captures| {
        replace_bare_file(caps.get(0).unwrap().as_str(), &caps[1], &caps["base"])
    });

    let text = DUPLICATE_FILE_TAG_RE.replace_all(&text, "@");
    let text = LONE_EXTENSION_TAG_RE.replace_all(&text, "${1}${ext}");

    let text = FRAGMENTED_TAG_RE.replace_all(&text, "@${left}${sep}${right}");
    let text = SPOKEN_FRAGMENTED_TAG_RE.replace_all(&text, |caps: &Captures| {
        let sep = if caps.name("sep").unwrap().as_str().to_lowercase().contains("under") {
            "_"
        } else {
            "-"
        };
        format!("{}@{}{sep}{}", &caps[1], &caps["left"], &caps["right"])
    });

    let text = VERB_PREFIX_TAG_FILE_RE.replace_all(&text, |caps: &Captures| {
        let verb = caps.name("verb").unwrap().as_str();
        let middle = caps.name("middle").map(|m| m.as_str().trim()).unwrap_or("");
        let prefix = caps.name("prefix").unwrap().as_str();
        let name = caps.name("name").unwrap().as_str();
        let lowered_name = name.to_lowercase();
        let lowered_prefix = prefix.to_lowercase();
        if lowered_name.starts_with(&format!("{lowered_prefix}-"))
            || lowered_name.starts_with(&format!("{lowered_prefix}_"))
        {
            return caps.get(0).unwrap().as_str().to_string();
        }
        if middle.is_empty() {
            format!("{verb} @{prefix}-{name}")
        } else {
            format!("{verb} {middle} @{prefix}-{name}")
        }
    });

    TAGGED_JS_LIST_RE
        .replace_all(&text, |caps: &Captures| {
            format!("{}{}", &caps["prefix"], caps["body"].replace('@', ""))
        })
        .into_owned()
}

/// Bare `<name> file` tagging with the generic-word guards.
///
/// The base must not start with a blocked word.  A blocked first word
/// falls back to tagging the second word alone ("update config file" →
/// "update @config"), the same result a match starting one word later
/// would produce.
fn replace_bare_file(whole: &str, prefix: &str, base: &str) -> String {
    let words: Vec<&str> = base.split_whitespace().collect();
    let first = words[0].to_lowercase();

    if BARE_FILE_START_BLOCK.contains(&first.as_str()) {
        if words.len() == 2 {
            let second = words[1];
            let second_lower = second.to_lowercase();
            if !BARE_FILE_START_BLOCK.contains(&second_lower.as_str())
                && !GENERIC_FILE_BASES.contains(&second_lower.as_str())
                && !FILE_EXTS.contains(&second_lower.as_str())
            {
                return format!("{prefix}{} @{second}", words[0]);
            }
        }
        return whole.to_string();
    }

    let lowered = base.to_lowercase();
    if GENERIC_FILE_BASES.contains(&lowered.as_str()) || FILE_EXTS.contains(&lowered.as_str()) {
        return whole.to_string();
    }

    let tag = WS_RE.replace_all(base.trim(), "_");
    format!("{prefix}@{tag}")
}

// ---------------------------------------------------------------------------
// Symbol tagging
// ---------------------------------------------------------------------------

/// Append `@name` to explicit symbol mentions (`refactor function parse_request`).
pub fn tag_symbol_mentions(text: &str) -> String {
    let tagged = SYMBOL_MENTION_RE.replace_all(text, |caps: &Captures| {
        let full = caps.get(0).unwrap().as_str();
        let name = caps.name("name").unwrap().as_str().trim();
        let normalized = name.trim_matches(|c: char| ".,!?;:".contains(c));
        if normalized.is_empty()
            || GENERIC_SYMBOLS.contains(&normalized.to_lowercase().as_str())
            || SYMBOL_FILE_EXT_RE.is_match(normalized)
            || full.contains(&format!("@{normalized}"))
        {
            return full.to_string();
        }
        format!("{full} @{normalized}")
    });
    dedupe_adjacent_symbol_tags(&tagged)
}

/// Collapse immediately repeated identical `@` tags.
fn dedupe_adjacent_symbol_tags(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for token in text.split_whitespace() {
        if token.starts_with('@') && out.last() == Some(&token) {
            continue;
        }
        out.push(token);
    }
    out.join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Acronyms ----------------------------------------------------------

    #[test]
    fn spelled_acronyms_are_normalized() {
        assert_eq!(normalize_spoken_acronyms("use jay ess here"), "use JS here");
        assert_eq!(normalize_spoken_acronyms("prefer tea ess types"), "prefer TS types");
    }

    #[test]
    fn framework_chess_homophone_is_rescued() {
        assert_eq!(normalize_spoken_acronyms("update plate chess"), "update plate JS");
        assert_eq!(normalize_spoken_acronyms("the next chess app"), "the next JS app");
    }

    #[test]
    fn plain_chess_is_left_alone() {
        assert_eq!(
            normalize_spoken_acronyms("we should play chess later"),
            "we should play chess later"
        );
    }

    // ---- File tagging ------------------------------------------------------

    #[test]
    fn explicit_file_names_are_tagged() {
        assert_eq!(tag_file_mentions("please update function.py file"), "please update @function.py");
        assert_eq!(tag_file_mentions("open config.yaml now"), "open @config.yaml now");
    }

    #[test]
    fn spoken_dot_files_are_tagged() {
        assert_eq!(
            tag_file_mentions("please update function dot py file"),
            "please update @function.py"
        );
        assert_eq!(
            tag_file_mentions("please update voiceflow dot dmg file"),
            "please update @voiceflow.dmg"
        );
    }

    #[test]
    fn spoken_complex_bases_join_with_separators() {
        let out = tag_file_mentions(
            "update text underscore refiner dot py and docker dash compose dot yml",
        );
        assert!(out.contains("@text_refiner.py"));
        assert!(out.contains("@docker-compose.yml"));
    }

    #[test]
    fn bare_name_file_is_tagged() {
        assert_eq!(tag_file_mentions("check the parser file"), "check the @parser");
    }

    #[test]
    fn generic_bases_are_not_tagged() {
        assert_eq!(tag_file_mentions("please open the file"), "please open the file");
    }

    #[test]
    fn bare_extension_is_not_tagged() {
        let out = tag_file_mentions("please update dmg file");
        assert!(!out.contains("@dmg"));
        assert!(out.contains("dmg file"));
    }

    #[test]
    fn lone_extension_tag_is_stripped() {
        let out = tag_file_mentions("the voiceflow @dmg release");
        assert!(!out.contains("@dmg"));
        assert!(out.contains("dmg"));
    }

    #[test]
    fn fragmented_tags_are_merged() {
        let out = tag_file_mentions("update text underscore @refiner.py and @docker-@compose.yml");
        assert!(out.contains("@text_refiner.py"));
        assert!(out.contains("@docker-compose.yml"));
    }

    #[test]
    fn rename_verb_merges_prefixed_tag() {
        let out = tag_file_mentions("then rename release notes.md to release-notes.md");
        assert!(out.to_lowercase().contains("rename @release-notes.md to @release-notes.md"));
        assert!(!out.to_lowercase().contains("release @notes.md"));
    }

    #[test]
    fn update_the_file_phrase_merges_prefix() {
        let out = tag_file_mentions("update the file release notes.md");
        assert!(out.to_lowercase().contains("update the file @release-notes.md"));
    }

    #[test]
    fn framework_tokens_are_never_tagged() {
        let out = tag_file_mentions("technical terms like next.js and plate.js");
        assert!(!out.contains("@next.js"));
        assert!(!out.contains("@plate.js"));
    }

    #[test]
    fn tagged_framework_list_is_untagged() {
        let out = tag_file_mentions("technical terms like @next.js, @play.js and @plate.js");
        assert!(out.to_lowercase().contains("terms like next.js, play.js and plate.js"));
        assert!(!out.contains('@'));
    }

    // ---- Symbol tagging ----------------------------------------------------

    #[test]
    fn symbol_mentions_get_a_tag() {
        assert_eq!(
            tag_symbol_mentions("please refactor function parse_request"),
            "please refactor function parse_request @parse_request"
        );
    }

    #[test]
    fn generic_symbol_names_are_skipped() {
        let out = tag_symbol_mentions("please update the function code");
        assert!(!out.contains('@'));
    }

    #[test]
    fn file_like_symbol_names_are_skipped() {
        let out = tag_symbol_mentions("please check module parser.py");
        assert!(!out.contains("@parser.py"));
    }

    #[test]
    fn symbol_tagging_is_idempotent() {
        let once = tag_symbol_mentions("please refactor function parse_request");
        let twice = tag_symbol_mentions(&once);
        assert_eq!(once, twice);
    }
}

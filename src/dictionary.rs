//! Misheard-term dictionary with auto-learned corrections.
//!
//! The dictionary maps phrases the STT model habitually gets wrong to their
//! correct replacements (`"plate js"` → `"Plate.js"`).  Corrections the user
//! confirms repeatedly are promoted into `auto_learned` once they cross
//! [`Dictionary::AUTO_LEARN_THRESHOLD`].
//!
//! Replacement ordering matters: the cleaner applies keys longest-first so a
//! short key never masks a longer one.  That ordering lives in the cleaner;
//! this module only stores the terms.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Terms every installation starts with.  User entries override these on
/// key collision.
const DEFAULT_TERMS: &[(&str, &str)] = &[
    ("oop", "OOP"),
    ("api", "API"),
    ("json", "JSON"),
    ("yaml", "YAML"),
    ("sql", "SQL"),
    ("css", "CSS"),
    ("html", "HTML"),
    ("http", "HTTP"),
    ("https", "HTTPS"),
    ("url", "URL"),
    ("cli", "CLI"),
    ("sdk", "SDK"),
    ("jwt", "JWT"),
    ("oauth", "OAuth"),
    ("github", "GitHub"),
    ("gitlab", "GitLab"),
    ("javascript", "JavaScript"),
    ("typescript", "TypeScript"),
    ("postgres", "Postgres"),
    ("kubernetes", "Kubernetes"),
];

// ---------------------------------------------------------------------------
// Dictionary
// ---------------------------------------------------------------------------

/// User dictionary persisted as `dictionary.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dictionary {
    /// Curated misheard-phrase → replacement pairs.
    pub terms: HashMap<String, String>,
    /// Pairs promoted automatically after repeated corrections.
    pub auto_learned: HashMap<String, String>,
    /// How often each misheard phrase has been corrected.
    pub correction_counts: HashMap<String, u32>,

    #[serde(skip)]
    save_path: Option<PathBuf>,
}

impl Dictionary {
    /// Corrections required before a pair is promoted to `auto_learned`.
    pub const AUTO_LEARN_THRESHOLD: u32 = 3;

    /// A dictionary holding only the built-in terms.
    pub fn with_defaults() -> Self {
        let mut dict = Self::default();
        for (wrong, right) in DEFAULT_TERMS {
            dict.terms.insert((*wrong).into(), (*right).into());
        }
        dict
    }

    /// Load the dictionary from `path`, merged over the built-in defaults.
    ///
    /// A missing file yields just the defaults bound to `path`; a corrupted
    /// file is logged and treated the same way so dictation keeps working.
    pub fn load(path: &Path) -> Self {
        let mut dict = Self::with_defaults();
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<Self>(&content) {
                    Ok(user) => {
                        dict.terms.extend(user.terms);
                        dict.auto_learned = user.auto_learned;
                        dict.correction_counts = user.correction_counts;
                    }
                    Err(e) => {
                        log::warn!("Corrupted dictionary file, using defaults: {e}");
                    }
                },
                Err(e) => {
                    log::warn!("Could not read dictionary file, using defaults: {e}");
                }
            }
        }
        dict.save_path = Some(path.to_path_buf());
        dict
    }

    /// Persist the dictionary to its load path.
    ///
    /// Writes to `path.tmp` first and renames so a crash mid-write never
    /// leaves a truncated file behind.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(target) = &self.save_path else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "no save path set",
            ));
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        content.push('\n');
        let tmp = target.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, target)?;
        Ok(())
    }

    /// Record a user correction; auto-learns the pair once the count crosses
    /// the threshold.
    pub fn record_correction(&mut self, wrong: &str, right: &str) {
        let key = wrong.to_lowercase();
        let count = self.correction_counts.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count >= Self::AUTO_LEARN_THRESHOLD {
            self.auto_learned.insert(key, right.to_string());
            if self.save_path.is_some() {
                if let Err(e) = self.save() {
                    log::warn!("Could not persist auto-learned term: {e}");
                }
            }
        }
    }

    /// All active replacement pairs (curated terms plus auto-learned).
    ///
    /// Auto-learned entries win on key collision: a promoted correction is
    /// fresher evidence than the shipped default.
    pub fn all_terms(&self) -> HashMap<String, String> {
        let mut merged = self.terms.clone();
        merged.extend(
            self.auto_learned
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }

    /// A prompt-friendly sentence listing the top replacement values, used
    /// to bias the STT decoder toward the user's vocabulary.
    ///
    /// Returns an empty string when the dictionary has no terms.
    pub fn stt_context(&self) -> String {
        let mut unique: Vec<String> = Vec::new();
        for value in self.terms.values().chain(self.auto_learned.values()) {
            if !unique.iter().any(|v| v == value) {
                unique.push(value.clone());
            }
        }
        unique.sort();
        unique.truncate(20);

        if unique.is_empty() {
            return String::new();
        }

        let (first_half, second_half) = unique.split_at(unique.len().min(10));
        let mut context = format!(
            "In this session, we're working with {}.",
            first_half.join(", ")
        );
        if !second_half.is_empty() {
            context.push_str(&format!(" The project also uses {}.", second_half.join(", ")));
        }
        context
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn dict_with_terms(pairs: &[(&str, &str)]) -> Dictionary {
        let mut dict = Dictionary::default();
        for (wrong, right) in pairs {
            dict.terms.insert(wrong.to_string(), right.to_string());
        }
        dict
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let dict = Dictionary::load(&dir.path().join("dictionary.json"));
        assert_eq!(dict.terms.get("oop").unwrap(), "OOP");
        assert!(dict.auto_learned.is_empty());
    }

    #[test]
    fn corrupted_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dictionary.json");
        std::fs::write(&path, "][").unwrap();
        let dict = Dictionary::load(&path);
        assert_eq!(dict.terms.get("api").unwrap(), "API");
    }

    #[test]
    fn user_terms_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dictionary.json");
        std::fs::write(&path, r#"{"terms": {"oop": "object orientation"}}"#).unwrap();
        let dict = Dictionary::load(&path);
        assert_eq!(dict.terms.get("oop").unwrap(), "object orientation");
        // Defaults the user did not touch are still present.
        assert_eq!(dict.terms.get("api").unwrap(), "API");
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dictionary.json");

        let mut dict = Dictionary::load(&path);
        dict.terms.insert("plate js".into(), "Plate.js".into());
        dict.save().unwrap();

        let reloaded = Dictionary::load(&path);
        assert_eq!(reloaded.terms.get("plate js").unwrap(), "Plate.js");
        // No stray tmp file left behind.
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn record_correction_promotes_after_threshold() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dictionary.json");
        let mut dict = Dictionary::load(&path);

        dict.record_correction("react dom", "ReactDOM");
        dict.record_correction("react dom", "ReactDOM");
        assert!(dict.auto_learned.is_empty());

        dict.record_correction("react dom", "ReactDOM");
        assert_eq!(dict.auto_learned.get("react dom").unwrap(), "ReactDOM");
        // Promotion is persisted immediately.
        let reloaded = Dictionary::load(&path);
        assert_eq!(reloaded.auto_learned.get("react dom").unwrap(), "ReactDOM");
    }

    #[test]
    fn all_terms_prefers_auto_learned_on_collision() {
        let mut dict = dict_with_terms(&[("api key", "API key")]);
        dict.auto_learned.insert("api key".into(), "ApiKey".into());
        assert_eq!(dict.all_terms().get("api key").unwrap(), "ApiKey");
    }

    #[test]
    fn stt_context_lists_unique_values() {
        let dict = dict_with_terms(&[
            ("plate js", "Plate.js"),
            ("plate jazz", "Plate.js"),
            ("react dom", "ReactDOM"),
        ]);
        let context = dict.stt_context();
        assert!(context.starts_with("In this session, we're working with"));
        assert_eq!(context.matches("Plate.js").count(), 1);
        assert!(context.contains("ReactDOM"));
    }

    #[test]
    fn stt_context_empty_dictionary_is_empty() {
        assert_eq!(Dictionary::default().stt_context(), "");
    }

    #[test]
    fn stt_context_splits_long_lists_across_two_sentences() {
        let pairs: Vec<(String, String)> = (0..15)
            .map(|i| (format!("term {i:02}"), format!("Term{i:02}")))
            .collect();
        let mut dict = Dictionary::default();
        for (wrong, right) in &pairs {
            dict.terms.insert(wrong.clone(), right.clone());
        }
        let context = dict.stt_context();
        assert!(context.contains("The project also uses"));
    }
}

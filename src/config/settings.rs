//! Application settings structs, defaults and JSON persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through `config.json` and shared across
//! threads.  Unknown keys in the file are ignored; a corrupted file is
//! replaced with defaults and rewritten so the next launch starts clean.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Default primary STT model (GGML file stem without the `ggml-` prefix).
pub const DEFAULT_STT_MODEL: &str = "large-v3-turbo";
/// Default model used in max-accuracy mode.
pub const DEFAULT_MAX_ACCURACY_MODEL: &str = "large-v3";
/// Last-resort STT model — small enough that it is almost always cached.
pub const DEFAULT_SAFE_FALLBACK_MODEL: &str = "base.en";

/// Model ids that older releases wrote to disk and that no longer resolve
/// to a downloadable file.  Loading migrates them to the current defaults.
const INVALID_MODEL_ALIASES: &[&str] = &["large", "large-v3-turbo-q8"];

// ---------------------------------------------------------------------------
// CleanupMode
// ---------------------------------------------------------------------------

/// Selects how much post-processing runs after STT.
///
/// | Variant     | Pipeline                                  |
/// |-------------|-------------------------------------------|
/// | Fast        | STT → deterministic clean                 |
/// | Standard    | STT → clean → LLM refiner (gated)         |
/// | MaxAccuracy | secondary STT model → clean → refiner     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    Fast,
    Standard,
    MaxAccuracy,
}

impl Default for CleanupMode {
    fn default() -> Self {
        Self::Standard
    }
}

// ---------------------------------------------------------------------------
// TranscriptionMode
// ---------------------------------------------------------------------------

/// Controls file/symbol tagging and the STT vocabulary hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionMode {
    /// Plain prose — no `@file` tags, no vocabulary bias.
    Normal,
    /// Dictation aimed at a code editor or AI coding prompt.
    Programmer,
}

impl Default for TranscriptionMode {
    fn default() -> Self {
        Self::Programmer
    }
}

// ---------------------------------------------------------------------------
// RecordingMode
// ---------------------------------------------------------------------------

/// How the hotkey drives the recording lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    /// Hold the key to record, release to stop.
    PushToTalk,
    /// Double-press to start, double-press to stop.
    Toggle,
}

impl Default for RecordingMode {
    fn default() -> Self {
        Self::PushToTalk
    }
}

// ---------------------------------------------------------------------------
// RefinerConfig
// ---------------------------------------------------------------------------

/// Settings for the LLM refinement step.
///
/// The refiner talks to a local OpenAI-compatible endpoint (Ollama by
/// default) so dictation never leaves the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    /// Base URL of the endpoint, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Model identifier sent to the API.
    pub model: String,
    /// Maximum seconds to wait for a response before giving up.
    pub timeout_secs: u64,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "qwen2.5:1.5b".into(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `config.json`.
///
/// # Persistence
///
/// ```rust,no_run
/// use whisperkey::config::AppConfig;
///
/// // Load (returns defaults and writes the file on first run)
/// let config = AppConfig::load();
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Recording lifecycle driven by the hotkey.
    pub recording_mode: RecordingMode,
    /// Hotkey name with a left/right distinction (e.g. `"right_cmd"`).
    pub hotkey: String,
    /// Hold shorter than this cancels the recording.
    pub min_hold_ms: u64,
    /// Consecutive silence that ends an utterance in streaming VAD use.
    pub silence_duration_ms: u64,
    /// Silero VAD speech-probability threshold (0.0 – 1.0).
    pub vad_threshold: f32,
    /// Primary STT model id (GGML file stem without `ggml-`).
    pub stt_model: String,
    /// STT model used when `cleanup_mode` is `MaxAccuracy`.
    pub max_accuracy_stt_model: String,
    /// `"auto"` or an ISO-639-1 code such as `"en"` / `"de"`.
    pub language: String,
    /// Post-processing depth.
    pub cleanup_mode: CleanupMode,
    /// File/symbol tagging and vocabulary bias.
    pub transcription_mode: TranscriptionMode,
    /// LLM refiner endpoint settings.
    pub refiner: RefinerConfig,
    /// Restore the previous clipboard contents after pasting.
    pub restore_clipboard: bool,
    /// Path to `dictionary.json`; empty resolves to the default location.
    pub dictionary_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            recording_mode: RecordingMode::default(),
            hotkey: "right_cmd".into(),
            min_hold_ms: 200,
            silence_duration_ms: 700,
            vad_threshold: 0.5,
            stt_model: DEFAULT_STT_MODEL.into(),
            max_accuracy_stt_model: DEFAULT_MAX_ACCURACY_MODEL.into(),
            language: "en".into(),
            cleanup_mode: CleanupMode::default(),
            transcription_mode: TranscriptionMode::default(),
            refiner: RefinerConfig::default(),
            restore_clipboard: true,
            dictionary_path: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `config.json`.
    ///
    /// Never fails: a missing file yields defaults (written back so the user
    /// can edit them), and a corrupted file is logged, replaced with
    /// defaults, and rewritten.
    pub fn load() -> Self {
        let paths = AppPaths::new();
        let config = Self::load_from(&paths.config_file);
        if let Err(e) = config.save_to(&paths.config_file) {
            log::warn!("Could not persist config: {e}");
        }
        config
    }

    /// Load from an explicit path (useful for tests).
    ///
    /// Unknown keys are ignored; parse failures fall back to defaults.
    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Could not read config file, using defaults: {e}");
                return Self::default();
            }
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(config) => config.migrated(),
            Err(e) => {
                log::warn!("Corrupted config file, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// Save configuration to the platform-appropriate `config.json`.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().config_file)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved path to the dictionary file.
    pub fn dictionary_file(&self) -> std::path::PathBuf {
        if self.dictionary_path.is_empty() {
            AppPaths::new().dictionary_file
        } else {
            std::path::PathBuf::from(&self.dictionary_path)
        }
    }

    /// Replace model ids that older releases persisted but that no longer
    /// resolve to a downloadable file.
    fn migrated(mut self) -> Self {
        if self.stt_model.is_empty() || INVALID_MODEL_ALIASES.contains(&self.stt_model.as_str()) {
            log::info!(
                "Migrating deprecated stt_model {:?} -> {DEFAULT_STT_MODEL:?}",
                self.stt_model
            );
            self.stt_model = DEFAULT_STT_MODEL.into();
        }
        if self.max_accuracy_stt_model.is_empty()
            || INVALID_MODEL_ALIASES.contains(&self.max_accuracy_stt_model.as_str())
        {
            self.max_accuracy_stt_model = DEFAULT_MAX_ACCURACY_MODEL.into();
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_json() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.json");

        let mut original = AppConfig::default();
        original.hotkey = "left_alt".into();
        original.cleanup_mode = CleanupMode::MaxAccuracy;
        original.transcription_mode = TranscriptionMode::Normal;
        original.language = "de".into();
        original.min_hold_ms = 250;
        original.restore_clipboard = false;

        original.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path);

        assert_eq!(original, loaded);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.json");

        let config = AppConfig::load_from(&path);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn corrupted_file_falls_back_to_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not valid json").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"hotkey": "left_ctrl", "some_future_option": 42}"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.hotkey, "left_ctrl");
        assert_eq!(config.min_hold_ms, AppConfig::default().min_hold_ms);
    }

    #[test]
    fn deprecated_model_alias_is_migrated() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"stt_model": "large"}"#).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.stt_model, DEFAULT_STT_MODEL);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.recording_mode, RecordingMode::PushToTalk);
        assert_eq!(cfg.hotkey, "right_cmd");
        assert_eq!(cfg.min_hold_ms, 200);
        assert_eq!(cfg.silence_duration_ms, 700);
        assert!((cfg.vad_threshold - 0.5).abs() < 1e-6);
        assert_eq!(cfg.cleanup_mode, CleanupMode::Standard);
        assert_eq!(cfg.transcription_mode, TranscriptionMode::Programmer);
        assert_eq!(cfg.refiner.base_url, "http://localhost:11434");
        assert!(cfg.restore_clipboard);
    }

    #[test]
    fn enums_serialise_as_snake_case() {
        let json = serde_json::to_string(&AppConfig::default()).unwrap();
        assert!(json.contains("\"push_to_talk\""));
        assert!(json.contains("\"standard\""));
        assert!(json.contains("\"programmer\""));
    }
}

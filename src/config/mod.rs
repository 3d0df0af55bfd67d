//! Configuration: settings structs, JSON persistence, platform paths.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, CleanupMode, RecordingMode, RefinerConfig, TranscriptionMode,
    DEFAULT_MAX_ACCURACY_MODEL, DEFAULT_SAFE_FALLBACK_MODEL, DEFAULT_STT_MODEL,
};

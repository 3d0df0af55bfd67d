//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings + dictionary):
//!   Windows: %APPDATA%\whisperkey\
//!   macOS:   ~/Library/Application Support/whisperkey/
//!   Linux:   ~/.config/whisperkey/
//!
//! Data dir (model cache):
//!   Windows: %LOCALAPPDATA%\whisperkey\
//!   macOS:   ~/Library/Application Support/whisperkey/
//!   Linux:   ~/.local/share/whisperkey/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `config.json` and `dictionary.json`.
    pub config_dir: PathBuf,
    /// Full path to `config.json`.
    pub config_file: PathBuf,
    /// Full path to `dictionary.json`.
    pub dictionary_file: PathBuf,
    /// Directory for downloaded model files (GGML + ONNX).
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "whisperkey";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let config_file = config_dir.join("config.json");
        let dictionary_file = config_dir.join("dictionary.json");
        let models_dir = data_dir.join("models");

        Self {
            config_dir,
            config_file,
            dictionary_file,
            models_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.models_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .config_file
            .file_name()
            .is_some_and(|n| n == "config.json"));
        assert!(paths
            .dictionary_file
            .file_name()
            .is_some_and(|n| n == "dictionary.json"));
    }
}

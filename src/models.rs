//! Model cache: download, integrity pinning, and path resolution.
//!
//! All model files live under the platform data directory (see
//! [`crate::config::AppPaths`]).  Downloads are restricted to a fixed
//! allow-list of HTTPS hosts and written atomically (`path.tmp` → rename)
//! so an interrupted download never leaves a half-written file that a later
//! launch would try to load.
//!
//! The Silero VAD model is additionally pinned to a SHA-256 digest and is
//! refused outright when the on-disk bytes do not match.

use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Hosts model downloads may come from.  Anything else is refused before a
/// single byte is fetched.
const ALLOWED_HOSTS: &[&str] = &["huggingface.co", "raw.githubusercontent.com"];

/// Silero VAD model location and pin.
const VAD_MODEL_FILE: &str = "silero_vad.onnx";
const VAD_MODEL_URL: &str =
    "https://raw.githubusercontent.com/snakers4/silero-vad/master/src/silero_vad/data/silero_vad.onnx";
/// SHA-256 of the pinned Silero VAD release.  Update only together with the
/// URL above after verifying the new digest out of band.
const VAD_MODEL_SHA256: &str = "a4a068cd6cf1ea8355b84327595838ca748ec29a25bc2332be722b2a3582b3fa";

/// Whisper GGML model repository (ggerganov conversion).
const STT_MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

// ---------------------------------------------------------------------------
// ModelError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model file not found: {0}")]
    NotFound(String),

    #[error("model failed integrity check: {0}")]
    Integrity(String),

    #[error("model download refused: {0}")]
    DownloadRefused(String),

    #[error("model download failed: {0}")]
    Download(String),

    #[error("model load failed: {0}")]
    Load(String),

    #[error("model cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

/// SHA-256 of a file, streamed in 1 MiB chunks.
pub fn file_sha256(path: &Path) -> Result<String, ModelError> {
    let mut file = std::fs::File::open(path)
        .map_err(|_| ModelError::NotFound(path.display().to_string()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Verify the on-disk VAD model against its pinned digest.
///
/// # Errors
///
/// [`ModelError::NotFound`] when the file is missing,
/// [`ModelError::Integrity`] when the digest differs from the pin.
pub fn verify_vad_model(path: &Path) -> Result<(), ModelError> {
    let digest = file_sha256(path)?;
    if digest != VAD_MODEL_SHA256 {
        return Err(ModelError::Integrity(format!(
            "{}: expected {VAD_MODEL_SHA256}, got {digest}",
            path.display()
        )));
    }
    Ok(())
}

/// Reject URLs that are not HTTPS against an allow-listed host.
fn check_download_url(url: &str) -> Result<(), ModelError> {
    let rest = url
        .strip_prefix("https://")
        .ok_or_else(|| ModelError::DownloadRefused(format!("not HTTPS: {url}")))?;
    let host = rest.split('/').next().unwrap_or("");
    if !ALLOWED_HOSTS.contains(&host) {
        return Err(ModelError::DownloadRefused(format!(
            "host {host:?} is not on the allow-list"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ModelCache
// ---------------------------------------------------------------------------

/// Resolves and maintains the on-disk model directory.
#[derive(Debug, Clone)]
pub struct ModelCache {
    models_dir: PathBuf,
}

impl ModelCache {
    pub fn new(models_dir: PathBuf) -> Self {
        Self { models_dir }
    }

    /// Path of the Silero VAD model file.
    pub fn vad_model_path(&self) -> PathBuf {
        self.models_dir.join(VAD_MODEL_FILE)
    }

    /// Path of a Whisper GGML model file for a model id such as
    /// `"large-v3-turbo"`.
    pub fn stt_model_path(&self, model_id: &str) -> PathBuf {
        self.models_dir.join(format!("ggml-{model_id}.bin"))
    }

    /// Whether the GGML file for `model_id` is already on disk.
    pub fn is_stt_model_cached(&self, model_id: &str) -> bool {
        self.stt_model_path(model_id).exists()
    }

    /// Ensure the VAD model is present and passes its pin; downloads it
    /// when missing or corrupt.
    pub async fn ensure_vad_model(&self) -> Result<PathBuf, ModelError> {
        let path = self.vad_model_path();
        if path.exists() && verify_vad_model(&path).is_ok() {
            return Ok(path);
        }
        if path.exists() {
            log::warn!("Cached VAD model failed its pin; re-downloading");
        }

        self.download_to(VAD_MODEL_URL, &path).await?;
        verify_vad_model(&path)?;
        Ok(path)
    }

    /// Ensure the GGML file for `model_id` is present; downloads it when
    /// missing.
    pub async fn ensure_stt_model(&self, model_id: &str) -> Result<PathBuf, ModelError> {
        let path = self.stt_model_path(model_id);
        if path.exists() {
            return Ok(path);
        }
        let url = format!("{STT_MODEL_BASE_URL}/ggml-{model_id}.bin");
        self.download_to(&url, &path).await?;
        Ok(path)
    }

    /// Fetch `url` into `target` via `target.tmp` + rename.
    async fn download_to(&self, url: &str, target: &Path) -> Result<(), ModelError> {
        check_download_url(url)?;
        std::fs::create_dir_all(&self.models_dir)?;

        log::info!("Downloading {url}");
        let response = reqwest::get(url)
            .await
            .map_err(|e| ModelError::Download(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ModelError::Download(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ModelError::Download(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ModelError::Download(format!("{url}: empty response")));
        }

        let tmp = tmp_path(target);
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, target)?;
        log::info!("Saved {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }
}

fn tmp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

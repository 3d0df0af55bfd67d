//! `SttBackend` trait and the whisper.cpp implementation.
//!
//! [`SttBackend`] is the seam the fallback router works through: engines
//! differ by model file but are driven identically.  [`WhisperEngine`] is
//! the production implementation over `whisper_rs`; a new `WhisperState`
//! is created per call so the engine needs no locking for inference.
//!
//! [`MockSttEngine`] (test-only) scripts responses so router and pipeline
//! behavior can be tested without GGML files.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::stt::transcribe::{
    decode_is_acceptable, optimal_threads, Segment, SegmentedTranscript,
};

/// whisper.cpp silently skips decode windows shorter than one second, so
/// shorter utterances are padded with trailing silence up to this length.
const MIN_DECODE_SAMPLES: usize = 16_000;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The GGML model file was not found at the given path.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// `whisper_rs` failed to initialise a context or state.
    #[error("whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// An error occurred during the inference pass.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Every candidate model failed; the summary lists each attempt.
    #[error("all transcription models failed: {summary}")]
    AllModelsFailed { summary: String },
}

// ---------------------------------------------------------------------------
// SttBackend trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech-to-text engines.
///
/// # Contract
///
/// `audio` is 16 kHz mono `f32` PCM.  `hint` is a short vocabulary-bias
/// sentence (may be empty).  `temperatures` is the retry ladder — at least
/// one entry; engines decode at each rung until the output passes the
/// quality checks or the ladder is exhausted.
pub trait SttBackend: Send + Sync {
    /// Identifier of the loaded model (e.g. `"large-v3-turbo"`).
    fn model_id(&self) -> &str;

    /// Transcribe and return the text transcript.
    fn transcribe(&self, audio: &[f32], hint: &str, temperatures: &[f32])
        -> Result<String, SttError>;

    /// Transcribe and return per-segment timing and confidence.
    fn transcribe_with_segments(&self, audio: &[f32]) -> Result<SegmentedTranscript, SttError>;

    /// Run a dummy inference so the first real call pays no load latency.
    fn warm_up(&self) -> Result<(), SttError>;

    /// Switch the decode language (`"auto"` or an ISO code).
    fn set_language(&mut self, language: &str);
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SttBackend>) {}
};

// ---------------------------------------------------------------------------
// Initial prompt
// ---------------------------------------------------------------------------

/// Decoder bias prompt: a language-appropriate framing sentence plus the
/// vocabulary hint.  Whisper truncates prompts past 224 tokens, so the
/// hint is kept short by the caller.
pub fn build_initial_prompt(language: &str, hint: &str) -> String {
    let base = match language {
        "de" => {
            "Die folgende Aufnahme stammt aus einer Softwareentwicklungssitzung. \
             Bitte klar und korrekt transkribieren."
        }
        "auto" => {
            "This is a software development dictation in English or German. \
             Transcribe clearly with natural punctuation."
        }
        _ => {
            "The following is a clean, well-punctuated transcription \
             from a software development session."
        }
    };
    if hint.is_empty() {
        base.to_string()
    } else {
        format!("{base} {hint}")
    }
}

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production STT engine over a `whisper_rs::WhisperContext`.
pub struct WhisperEngine {
    ctx: WhisperContext,
    model_id: String,
    language: String,
    n_threads: i32,
    warmed: AtomicBool,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("model_id", &self.model_id)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

// `WhisperContext` holds a raw pointer internally but whisper-rs declares
// it Send+Sync — the weights are read-only after loading, and each call
// creates its own `WhisperState`.
// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model from `model_path`.
    pub fn load(
        model_id: impl Into<String>,
        model_path: impl AsRef<Path>,
        language: impl Into<String>,
    ) -> Result<Self, SttError> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }
        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        Ok(Self {
            ctx,
            model_id: model_id.into(),
            language: language.into(),
            n_threads: optimal_threads(),
            warmed: AtomicBool::new(false),
        })
    }

    /// One decode pass at a fixed temperature.
    fn decode(
        &self,
        audio: &[f32],
        hint: &str,
        temperature: f32,
    ) -> Result<SegmentedTranscript, SttError> {
        let mut padded;
        let audio = if audio.len() < MIN_DECODE_SAMPLES {
            padded = audio.to_vec();
            padded.resize(MIN_DECODE_SAMPLES, 0.0);
            &padded[..]
        } else {
            audio
        };

        let mut fp = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        let lang: Option<&str> = if self.language == "auto" {
            None
        } else {
            Some(self.language.as_str())
        };
        fp.set_language(lang);
        fp.set_n_threads(self.n_threads);
        fp.set_print_progress(false);
        fp.set_print_realtime(false);
        fp.set_print_special(false);
        fp.set_suppress_blank(true);
        fp.set_no_context(true);
        fp.set_temperature(temperature);
        // The retry ladder is driven here, not inside whisper.cpp.
        fp.set_temperature_inc(0.0);

        let prompt = build_initial_prompt(&self.language, hint);
        fp.set_initial_prompt(&prompt);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        state
            .full(fp, audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut text = String::new();
        let mut segments: Vec<Segment> = Vec::with_capacity(n_segments as usize);

        for i in 0..n_segments {
            let seg_text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;

            let n_tokens = state
                .full_n_tokens(i)
                .map_err(|e| SttError::Transcription(e.to_string()))?;
            let mut logprob_sum = 0.0f32;
            for j in 0..n_tokens {
                let p = state.full_get_token_prob(i, j).unwrap_or(1.0);
                logprob_sum += p.max(1e-8).ln();
            }
            let avg_logprob = if n_tokens > 0 {
                logprob_sum / n_tokens as f32
            } else {
                0.0
            };

            // Timestamps are centiseconds.
            let t0 = state.full_get_segment_t0(i).unwrap_or(0).max(0) as u64 * 10;
            let t1 = state.full_get_segment_t1(i).unwrap_or(0).max(0) as u64 * 10;

            text.push_str(&seg_text);
            segments.push(Segment {
                text: seg_text,
                start_ms: t0,
                end_ms: t1,
                avg_logprob,
            });
        }

        Ok(SegmentedTranscript {
            text: text.trim().to_string(),
            segments,
        })
    }
}

impl SttBackend for WhisperEngine {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn transcribe(
        &self,
        audio: &[f32],
        hint: &str,
        temperatures: &[f32],
    ) -> Result<String, SttError> {
        let mut last: Option<SegmentedTranscript> = None;
        for &temperature in temperatures {
            let transcript = self.decode(audio, hint, temperature)?;
            if decode_is_acceptable(&transcript) {
                return Ok(transcript.text);
            }
            log::debug!(
                "decode at temperature {temperature} rejected (avg_logprob {:.2}); retrying",
                transcript.avg_logprob()
            );
            last = Some(transcript);
        }
        Ok(last.map(|t| t.text).unwrap_or_default())
    }

    fn transcribe_with_segments(&self, audio: &[f32]) -> Result<SegmentedTranscript, SttError> {
        self.decode(audio, "", 0.0)
    }

    fn warm_up(&self) -> Result<(), SttError> {
        if self.warmed.load(Ordering::Acquire) {
            return Ok(());
        }
        log::info!("Warming up STT model {}", self.model_id);
        let silence = vec![0.0f32; 16_000];
        self.decode(&silence, "", 0.0)?;
        self.warmed.store(true, Ordering::Release);
        log::info!("STT warm-up complete ({})", self.model_id);
        Ok(())
    }

    fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// Test double with scripted responses and call counting.
#[cfg(test)]
pub struct MockSttEngine {
    model_id: String,
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String, SttError>>>,
    fallback: Result<String, SttError>,
    warm_up_fails: bool,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSttEngine {
    /// Always returns `Ok(text)`.
    pub fn ok(model_id: &str, text: &str) -> Self {
        Self {
            model_id: model_id.into(),
            responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
            fallback: Ok(text.into()),
            warm_up_fails: false,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Always fails, both warm-up and transcription.
    pub fn failing(model_id: &str) -> Self {
        Self {
            model_id: model_id.into(),
            responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
            fallback: Err(SttError::Transcription(format!(
                "simulated failure: {model_id}"
            ))),
            warm_up_fails: true,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Returns the scripted responses in order, then `fallback`.
    pub fn scripted(model_id: &str, responses: Vec<&str>) -> Self {
        Self {
            model_id: model_id.into(),
            responses: std::sync::Mutex::new(
                responses.into_iter().map(|r| Ok(r.to_string())).collect(),
            ),
            fallback: Ok(String::new()),
            warm_up_fails: false,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
impl SttBackend for MockSttEngine {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn transcribe(&self, _audio: &[f32], _hint: &str, _t: &[f32]) -> Result<String, SttError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            return next;
        }
        self.fallback.clone()
    }

    fn transcribe_with_segments(&self, audio: &[f32]) -> Result<SegmentedTranscript, SttError> {
        let text = self.transcribe(audio, "", &[0.0])?;
        Ok(SegmentedTranscript {
            text: text.clone(),
            segments: vec![Segment {
                text,
                start_ms: 0,
                end_ms: (audio.len() as u64 * 1000) / 16_000,
                avg_logprob: -0.1,
            }],
        })
    }

    fn warm_up(&self) -> Result<(), SttError> {
        if self.warm_up_fails {
            return Err(SttError::ContextInit(format!(
                "simulated warm-up failure: {}",
                self.model_id
            )));
        }
        Ok(())
    }

    fn set_language(&mut self, _language: &str) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

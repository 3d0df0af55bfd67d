//! Voice activity detection backed by the Silero VAD ONNX model.
//!
//! [`VoiceActivityDetector`] wraps an `ort` inference session over the
//! Silero model.  The session is loaded lazily, exactly once, and only
//! after the model file passes its pinned SHA-256 check (see
//! [`crate::models`]) — a tampered or truncated model is refused, not
//! tolerated.
//!
//! Two call styles:
//! * [`speech_probability`](VoiceActivityDetector::speech_probability) —
//!   frame-level probability, recurrent state preserved across calls.
//! * [`process_chunk`](VoiceActivityDetector::process_chunk) — stateful
//!   utterance-boundary detection with a ~300 ms pre-roll so word onsets
//!   are not clipped.
//!
//! The boundary bookkeeping lives in [`UtteranceAssembler`], which is pure
//! and testable without a model file.

use std::path::PathBuf;

use ndarray::{arr0, Array2, Array3};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use thiserror::Error;

use super::capture::SAMPLE_RATE;
use super::ring::SampleRing;
use crate::models::ModelError;

/// Block duration assumed by the silence-limit conversion (512 samples).
const CHUNK_MS: u64 = 32;
/// Pre-roll kept while waiting for speech onset.
const PRE_ROLL_MS: u64 = 300;
/// Silero LSTM state shape.
const STATE_SHAPE: (usize, usize, usize) = (2, 1, 64);

// ---------------------------------------------------------------------------
// VadError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum VadError {
    /// Model missing, failed its integrity pin, or failed to load.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The inference session rejected the input or failed mid-run.
    #[error("VAD inference failed: {0}")]
    Inference(String),
}

// ---------------------------------------------------------------------------
// UtteranceAssembler
// ---------------------------------------------------------------------------

/// Pure utterance-boundary bookkeeping.
///
/// Feed `(chunk, is_speech)` pairs; returns the concatenated utterance once
/// `silence_limit` consecutive non-speech chunks follow speech.  While no
/// speech has been seen, chunks accumulate in the pre-roll ring so the
/// first speech chunk carries its onset audio.
pub struct UtteranceAssembler {
    pre_roll: SampleRing,
    speech: Vec<f32>,
    silence_blocks: u32,
    silence_limit: u32,
}

impl UtteranceAssembler {
    pub fn new(silence_limit: u32, pre_roll_samples: usize) -> Self {
        Self {
            pre_roll: SampleRing::new(pre_roll_samples.max(1)),
            speech: Vec::new(),
            silence_blocks: 0,
            silence_limit: silence_limit.max(1),
        }
    }

    /// Feed one classified chunk; returns a finished utterance, if any.
    pub fn push(&mut self, chunk: &[f32], is_speech: bool) -> Option<Vec<f32>> {
        if is_speech {
            if self.speech.is_empty() {
                self.speech = self.pre_roll.take();
            }
            self.speech.extend_from_slice(chunk);
            self.silence_blocks = 0;
            return None;
        }

        if self.speech.is_empty() {
            self.pre_roll.push_slice(chunk);
            return None;
        }

        // Trailing silence still belongs to the utterance.
        self.speech.extend_from_slice(chunk);
        self.silence_blocks += 1;
        if self.silence_blocks >= self.silence_limit {
            self.silence_blocks = 0;
            return Some(std::mem::take(&mut self.speech));
        }
        None
    }

    /// Clear the pre-roll, accumulated speech and counters.
    pub fn reset(&mut self) {
        self.pre_roll.clear();
        self.speech.clear();
        self.silence_blocks = 0;
    }
}

// ---------------------------------------------------------------------------
// VoiceActivityDetector
// ---------------------------------------------------------------------------

/// Silero VAD wrapper with lazy, integrity-checked model loading.
pub struct VoiceActivityDetector {
    model_path: PathBuf,
    threshold: f32,
    session: Option<Session>,
    h: Array3<f32>,
    c: Array3<f32>,
    assembler: UtteranceAssembler,
}

impl VoiceActivityDetector {
    /// `threshold` is the speech-probability cut-off; chunks scoring above
    /// it count as voice.  `silence_duration_ms` controls how much trailing
    /// silence ends an utterance in [`process_chunk`](Self::process_chunk).
    pub fn new(model_path: PathBuf, threshold: f32, silence_duration_ms: u64) -> Self {
        let silence_limit = (silence_duration_ms / CHUNK_MS).max(1) as u32;
        let pre_roll_samples = (PRE_ROLL_MS * SAMPLE_RATE as u64 / 1000) as usize;
        Self {
            model_path,
            threshold,
            session: None,
            h: Array3::zeros(STATE_SHAPE),
            c: Array3::zeros(STATE_SHAPE),
            assembler: UtteranceAssembler::new(silence_limit, pre_roll_samples),
        }
    }

    /// Speech probability in `[0, 1]` for a single ~32 ms chunk.
    ///
    /// Recurrent LSTM state carries across calls; call
    /// [`reset`](Self::reset) between unrelated recordings.
    pub fn speech_probability(&mut self, chunk: &[f32]) -> Result<f32, VadError> {
        self.ensure_session()?;
        self.infer(chunk)
    }

    /// Whether a single chunk scores above the speech threshold.
    pub fn is_speech(&mut self, chunk: &[f32]) -> Result<bool, VadError> {
        Ok(self.speech_probability(chunk)? > self.threshold)
    }

    /// Stateful boundary detection: returns a complete utterance (pre-roll
    /// included) once enough trailing silence follows speech.
    pub fn process_chunk(&mut self, chunk: &[f32]) -> Result<Option<Vec<f32>>, VadError> {
        let prob = self.speech_probability(chunk)?;
        Ok(self.assembler.push(chunk, prob > self.threshold))
    }

    /// Clear the pre-roll, accumulated speech, counters and LSTM state.
    pub fn reset(&mut self) {
        self.assembler.reset();
        self.h = Array3::zeros(STATE_SHAPE);
        self.c = Array3::zeros(STATE_SHAPE);
    }

    /// Load the session on first use; verifies the pinned SHA-256 first.
    fn ensure_session(&mut self) -> Result<(), VadError> {
        if self.session.is_some() {
            return Ok(());
        }

        crate::models::verify_vad_model(&self.model_path)?;

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_file(&self.model_path))
            .map_err(|e| {
                VadError::Model(ModelError::Load(format!(
                    "{}: {e}",
                    self.model_path.display()
                )))
            })?;

        log::info!("Silero VAD session ready ({})", self.model_path.display());
        self.session = Some(session);
        Ok(())
    }

    fn infer(&mut self, chunk: &[f32]) -> Result<f32, VadError> {
        let input = Array2::from_shape_vec((1, chunk.len()), chunk.to_vec())
            .map_err(|e| VadError::Inference(e.to_string()))?;
        let sr = arr0(SAMPLE_RATE as i64);

        let session = self.session.as_mut().expect("session ensured");
        let outputs = session
            .run(ort::inputs![
                "input" => Tensor::from_array(input).map_err(|e| VadError::Inference(e.to_string()))?,
                "sr" => Tensor::from_array(sr).map_err(|e| VadError::Inference(e.to_string()))?,
                "h" => Tensor::from_array(self.h.clone()).map_err(|e| VadError::Inference(e.to_string()))?,
                "c" => Tensor::from_array(self.c.clone()).map_err(|e| VadError::Inference(e.to_string()))?,
            ])
            .map_err(|e| VadError::Inference(e.to_string()))?;

        let prob = {
            let (_, data) = outputs
                .get("output")
                .ok_or_else(|| VadError::Inference("missing 'output' tensor".into()))?
                .try_extract_tensor::<f32>()
                .map_err(|e| VadError::Inference(e.to_string()))?;
            data.first().copied().unwrap_or(0.0)
        };

        let hn = {
            let (_, data) = outputs
                .get("hn")
                .ok_or_else(|| VadError::Inference("missing 'hn' tensor".into()))?
                .try_extract_tensor::<f32>()
                .map_err(|e| VadError::Inference(e.to_string()))?;
            data.to_vec()
        };
        let cn = {
            let (_, data) = outputs
                .get("cn")
                .ok_or_else(|| VadError::Inference("missing 'cn' tensor".into()))?
                .try_extract_tensor::<f32>()
                .map_err(|e| VadError::Inference(e.to_string()))?;
            data.to_vec()
        };
        drop(outputs);

        self.h = Array3::from_shape_vec(STATE_SHAPE, hn)
            .map_err(|e| VadError::Inference(e.to_string()))?;
        self.c = Array3::from_shape_vec(STATE_SHAPE, cn)
            .map_err(|e| VadError::Inference(e.to_string()))?;

        Ok(prob.clamp(0.0, 1.0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

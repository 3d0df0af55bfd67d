//! Audio capture, loudness analysis, and voice-activity detection.
//!
//! ```text
//! cpal callback ──▶ block queue ──▶ AudioCapture::stop (adaptive tail)
//!        │                                  │
//!        └──▶ rolling RMS window            └──▶ 16 kHz mono f32 waveform
//!
//! VoiceActivityDetector: Silero ONNX, frame probabilities + utterance
//! boundaries with pre-roll.
//! ```

pub mod capture;
pub mod level;
pub mod resample;
pub mod ring;
pub mod vad;

pub use capture::{
    min_trailing_budget_ms, trailing_budget_ms, AudioCapture, CaptureError, BLOCK_SIZE,
    SAMPLE_RATE,
};
pub use level::{percentile, rms};
pub use resample::{downmix_to_mono, resample_to_16k};
pub use ring::SampleRing;
pub use vad::{UtteranceAssembler, VadError, VoiceActivityDetector};

//! Speech-to-text: backend trait, whisper.cpp engine, chunked long-audio
//! decoding, and the model-fallback router.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                       SttRouter                        │
//! │  [active, configured, primary, max-accuracy, base.en]  │
//! │                │ fallback + atomic swap                 │
//! │                ▼                                       │
//! │        SttBackend (trait) ──▶ WhisperEngine            │
//! │                │                                       │
//! │   chunking: split ──▶ decode ──▶ overlap stitch        │
//! │                        └──▶ tail-pass (≥95 s)          │
//! └────────────────────────────────────────────────────────┘
//! ```

pub mod chunking;
pub mod engine;
pub mod router;
pub mod transcribe;

pub use chunking::{find_token_overlap, is_tail_covered, merge_transcript_parts,
    split_for_long_transcription};
pub use engine::{build_initial_prompt, SttBackend, SttError, WhisperEngine};
pub use router::{CachedProbe, EngineFactory, SttRouter};
pub use transcribe::{temperature_ladder, Segment, SegmentedTranscript};

#[cfg(test)]
pub use engine::MockSttEngine;

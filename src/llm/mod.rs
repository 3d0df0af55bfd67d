//! Optional LLM refinement layer.
//!
//! The refiner rewrites already-cleaned transcripts through a local
//! instruction-tuned model; its output is accepted only when the guards in
//! [`guard`] agree it is still a transcription and not an answer.

pub mod guard;
pub mod refiner;

pub use guard::{is_answer_like, max_output_tokens, sanitize_output, select_vocab_hints};
pub use refiner::{ApiRefiner, RefinerBackend, RefinerError, TextRefiner};

//! whisperkey — local, privacy-preserving push-to-talk dictation.
//!
//! Hold a hotkey, speak, release: the audio never leaves the machine.  A
//! Silero VAD gate and whisper.cpp transcription feed a deterministic text
//! cleaner (and an optional, heavily guarded local LLM refiner), and the
//! result is pasted at the cursor of whichever app was focused when the
//! hotkey went down.
//!
//! # Module map
//!
//! | Module        | Responsibility                                        |
//! |---------------|-------------------------------------------------------|
//! | `audio`       | capture + adaptive trailing tail, ring buffer, VAD    |
//! | `stt`         | whisper backend, chunked decoding, model fallback     |
//! | `text`        | deterministic cleaner (corrections, tags, readability)|
//! | `llm`         | guarded LLM refiner over a local endpoint             |
//! | `pipeline`    | orchestration: trim → gate → STT → filters → clean    |
//! | `inject`      | clipboard paste with generation-checked restore       |
//! | `hotkey`      | global key-hold state machine                         |
//! | `coordinator` | recording lifecycle, focus restore, worker threads    |
//! | `config`      | JSON settings + platform paths                        |
//! | `dictionary`  | misheard-term dictionary with auto-learning           |
//! | `models`      | model cache, allow-listed downloads, SHA-256 pinning  |
//! | `signals`     | status hub for external UI collaborators              |

pub mod audio;
pub mod config;
pub mod coordinator;
pub mod dictionary;
pub mod hotkey;
pub mod inject;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod platform;
pub mod signals;
pub mod stt;
pub mod text;

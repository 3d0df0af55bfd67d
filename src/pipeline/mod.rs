//! Transcription pipeline orchestrator.
//!
//! `process` runs one finalized utterance through:
//!
//! ```text
//! silence trim ──▶ VAD gate ──▶ adaptive STT ──▶ hallucination/echo filter
//!      ──▶ clean ──▶ refinement gate ──▶ refiner (guarded) ──▶ final clean
//!      ──▶ completeness preservation ──▶ text
//! ```
//!
//! A non-empty raw transcript can legitimately produce empty output — that
//! is the hallucination and prompt-echo filters doing their job.

pub mod guards;
pub mod trim;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::audio::{VadError, VoiceActivityDetector};
use crate::config::{AppConfig, CleanupMode, RefinerConfig, TranscriptionMode};
use crate::dictionary::Dictionary;
use crate::llm::TextRefiner;
use crate::models::ModelCache;
use crate::signals::transcript_for_log;
use crate::stt::{SttError, SttRouter};
use crate::text;

pub use guards::{
    is_hallucination, is_prompt_echo, is_suspicious_intent, is_suspiciously_short_refinement,
    preserve_completeness, should_refine,
};
pub use trim::trim_silence_for_decode;

/// Frames probed (evenly spaced) by the VAD speech gate.
const VAD_PROBE_FRAMES: usize = 24;
/// VAD frame size in samples (~32 ms).
const VAD_FRAME: usize = 512;

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Stt(#[from] SttError),

    #[error(transparent)]
    Vad(#[from] VadError),
}

// ---------------------------------------------------------------------------
// PipelineSettings
// ---------------------------------------------------------------------------

/// The runtime-switchable subset of configuration the pipeline reads.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub cleanup_mode: CleanupMode,
    pub transcription_mode: TranscriptionMode,
    pub language: String,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            cleanup_mode: config.cleanup_mode,
            transcription_mode: config.transcription_mode,
            language: config.language.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptionPipeline
// ---------------------------------------------------------------------------

/// Owns the STT router, VAD, refiner and cleaning rules for one dictation
/// at a time.  `process` is called from a worker thread; interior mutexes
/// serialize the engines (the coordinator's `processing` flag already
/// prevents concurrent dictations).
pub struct TranscriptionPipeline {
    stt: Mutex<SttRouter>,
    vad: Mutex<VoiceActivityDetector>,
    refiner: Mutex<Option<TextRefiner>>,
    refiner_config: RefinerConfig,
    dictionary: Arc<Mutex<Dictionary>>,
    settings: Mutex<PipelineSettings>,
    runtime: Option<tokio::runtime::Handle>,
}

impl TranscriptionPipeline {
    /// Production pipeline from config + model cache.
    pub fn from_config(
        config: &AppConfig,
        cache: &ModelCache,
        dictionary: Arc<Mutex<Dictionary>>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let stt = SttRouter::new(
            cache.clone(),
            config.stt_model.clone(),
            config.max_accuracy_stt_model.clone(),
            config.language.clone(),
            config.cleanup_mode,
        );
        let vad = VoiceActivityDetector::new(
            cache.vad_model_path(),
            config.vad_threshold,
            config.silence_duration_ms,
        );
        let refiner = if config.cleanup_mode == CleanupMode::Fast {
            None
        } else {
            Some(TextRefiner::from_config(&config.refiner))
        };

        Self::new(
            stt,
            vad,
            refiner,
            config.refiner.clone(),
            dictionary,
            PipelineSettings::from_config(config),
            Some(runtime),
        )
    }

    /// Pipeline from explicit parts — the seam the tests use.
    pub fn new(
        stt: SttRouter,
        vad: VoiceActivityDetector,
        refiner: Option<TextRefiner>,
        refiner_config: RefinerConfig,
        dictionary: Arc<Mutex<Dictionary>>,
        settings: PipelineSettings,
        runtime: Option<tokio::runtime::Handle>,
    ) -> Self {
        Self {
            stt: Mutex::new(stt),
            vad: Mutex::new(vad),
            refiner: Mutex::new(refiner),
            refiner_config,
            dictionary,
            settings: Mutex::new(settings),
            runtime,
        }
    }

    /// Warm up the STT chain (loads the first working candidate model).
    pub fn warm_up(&self) -> Result<(), SttError> {
        self.stt.lock().unwrap().warm_up_with_fallback()
    }

    /// Run the full pipeline on one utterance.
    pub fn process(&self, audio: &[f32]) -> Result<String, PipelineError> {
        let trimmed = trim_silence_for_decode(audio);
        let decode_audio: &[f32] = trimmed.as_deref().unwrap_or(audio);
        if trimmed.is_some() {
            log::debug!(
                "Silence trim: {} -> {} samples",
                audio.len(),
                decode_audio.len()
            );
        }

        if !self.has_speech(decode_audio)? {
            log::info!("No speech detected; skipping transcription");
            return Ok(String::new());
        }

        let hint = {
            let settings = self.settings.lock().unwrap();
            if settings.transcription_mode == TranscriptionMode::Programmer {
                self.dictionary.lock().unwrap().stt_context()
            } else {
                String::new()
            }
        };

        let raw = self
            .stt
            .lock()
            .unwrap()
            .transcribe_adaptive(decode_audio, &hint)?;
        log::info!("Raw transcription: {}", transcript_for_log(&raw));

        Ok(self.process_transcript(&raw))
    }

    /// Everything after STT: filters, cleaning, gated refinement,
    /// finalization, completeness preservation.
    pub fn process_transcript(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return String::new();
        }
        if is_hallucination(raw) {
            log::info!("Discarding blocklisted hallucination");
            return String::new();
        }
        if is_prompt_echo(raw) {
            log::info!("Discarding prompt echo");
            return String::new();
        }

        let (cleanup_mode, programmer) = {
            let settings = self.settings.lock().unwrap();
            (
                settings.cleanup_mode,
                settings.transcription_mode == TranscriptionMode::Programmer,
            )
        };
        let terms: HashMap<String, String> = if programmer {
            self.dictionary.lock().unwrap().all_terms()
        } else {
            HashMap::new()
        };

        let mut cleaned = text::clean(raw, &terms, programmer);
        log::info!("After cleanup: {}", transcript_for_log(&cleaned));

        if cleanup_mode != CleanupMode::Fast && should_refine(&cleaned, raw) {
            if let Some(refined) = self.refine_blocking(&cleaned, &terms) {
                let accept = !refined.is_empty()
                    && !is_suspiciously_short_refinement(&cleaned, &refined)
                    && !(programmer && is_suspicious_intent(&cleaned, &refined));
                if accept {
                    log::info!("After refinement: {}", transcript_for_log(&refined));
                    cleaned = refined;
                } else if !refined.is_empty() {
                    log::info!("Refinement rejected; keeping deterministic clean");
                }
            }
        }

        // Deterministic rules always win, even over an accepted rewrite.
        let finalized = text::clean(&cleaned, &terms, programmer);
        preserve_completeness(raw, &finalized, &terms, programmer)
    }

    /// VAD gate over evenly spaced probe frames.
    fn has_speech(&self, audio: &[f32]) -> Result<bool, VadError> {
        let mut vad = self.vad.lock().unwrap();
        vad.reset();

        let frames = audio.len() / VAD_FRAME;
        if frames == 0 {
            return Ok(false);
        }
        let step = (frames / VAD_PROBE_FRAMES).max(1);

        let mut index = 0;
        while index < frames {
            let start = index * VAD_FRAME;
            if vad.is_speech(&audio[start..start + VAD_FRAME])? {
                return Ok(true);
            }
            index += step;
        }
        Ok(false)
    }

    /// Call the refiner from this (synchronous) worker thread.  `None`
    /// covers every way refinement can be unavailable or fail — the caller
    /// keeps the deterministic clean.
    fn refine_blocking(&self, text: &str, terms: &HashMap<String, String>) -> Option<String> {
        let Some(runtime) = &self.runtime else {
            return None;
        };
        let refiner = self.refiner.lock().unwrap();
        let Some(refiner) = refiner.as_ref() else {
            log::debug!("Refiner not loaded; keeping deterministic clean");
            return None;
        };
        match runtime.block_on(refiner.refine(text, terms)) {
            Ok(refined) => Some(refined),
            Err(e) => {
                log::warn!("Refinement failed, keeping deterministic clean: {e}");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Runtime mode switches
    // -----------------------------------------------------------------------

    pub fn set_cleanup_mode(&self, mode: CleanupMode) {
        self.settings.lock().unwrap().cleanup_mode = mode;
        self.stt.lock().unwrap().set_cleanup_mode(mode);

        let mut refiner = self.refiner.lock().unwrap();
        match mode {
            CleanupMode::Fast => {
                *refiner = None;
            }
            _ => {
                if refiner.is_none() {
                    *refiner = Some(TextRefiner::from_config(&self.refiner_config));
                }
            }
        }
    }

    pub fn set_transcription_mode(&self, mode: TranscriptionMode) {
        self.settings.lock().unwrap().transcription_mode = mode;
    }

    pub fn set_language(&self, language: &str) {
        self.settings.lock().unwrap().language = language.to_string();
        self.stt.lock().unwrap().set_language(language);
    }

    /// Whether file/symbol tagging is active.
    pub fn programmer_mode_enabled(&self) -> bool {
        self.settings.lock().unwrap().transcription_mode == TranscriptionMode::Programmer
    }

    /// Release model memory (shutdown path; never called mid-dictation).
    pub fn unload_models(&self) {
        self.stt.lock().unwrap().unload();
        *self.refiner.lock().unwrap() = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::engine::MockSttEngine;
    use crate::stt::{EngineFactory, SttBackend};
    use std::path::PathBuf;

    fn mock_router(transcript: &str) -> SttRouter {
        let text = transcript.to_string();
        let factory: EngineFactory = Box::new(move |model_id, _lang| {
            Ok(Box::new(MockSttEngine::ok(model_id, &text)) as Box<dyn SttBackend>)
        });
        SttRouter::with_parts(
            factory,
            Box::new(|_| true),
            "primary".into(),
            "max-accuracy".into(),
            "en".into(),
            CleanupMode::Fast,
        )
    }

    fn pipeline(mode: TranscriptionMode) -> TranscriptionPipeline {
        let settings = PipelineSettings {
            cleanup_mode: CleanupMode::Fast,
            transcription_mode: mode,
            language: "en".into(),
        };
        TranscriptionPipeline::new(
            mock_router(""),
            VoiceActivityDetector::new(PathBuf::from("/nonexistent/silero.onnx"), 0.5, 700),
            None,
            RefinerConfig::default(),
            Arc::new(Mutex::new(Dictionary::with_defaults())),
            settings,
            None,
        )
    }

    // ---- Hallucination + echo ----------------------------------------------

    #[test]
    fn hallucinated_thank_you_produces_empty_output() {
        let p = pipeline(TranscriptionMode::Programmer);
        assert_eq!(p.process_transcript("Thank you."), "");
    }

    #[test]
    fn thank_you_inside_a_sentence_survives() {
        let p = pipeline(TranscriptionMode::Programmer);
        let out = p.process_transcript("I want to thank you for helping me with the code review.");
        assert!(out.to_lowercase().contains("thank you"));
    }

    #[test]
    fn prompt_echo_produces_empty_output() {
        let p = pipeline(TranscriptionMode::Programmer);
        assert_eq!(
            p.process_transcript("Transcribe clearly with natural punctuation."),
            ""
        );
    }

    #[test]
    fn normal_text_passes_the_echo_filter() {
        let p = pipeline(TranscriptionMode::Programmer);
        let out = p.process_transcript("We need to update the deployment scripts for staging.");
        assert!(out.to_lowercase().contains("update the deployment scripts"));
    }

    #[test]
    fn empty_raw_produces_empty_output() {
        let p = pipeline(TranscriptionMode::Programmer);
        assert_eq!(p.process_transcript("   "), "");
    }

    // ---- Mode-dependent behavior -------------------------------------------

    #[test]
    fn programmer_mode_tags_files() {
        let p = pipeline(TranscriptionMode::Programmer);
        let out = p.process_transcript("please update function.py file");
        assert!(out.to_lowercase().contains("@function.py"));
    }

    #[test]
    fn normal_mode_skips_file_tagging() {
        let p = pipeline(TranscriptionMode::Normal);
        let out = p.process_transcript("please update function.py file");
        assert!(out.to_lowercase().contains("function.py"));
        assert!(!out.to_lowercase().contains("@function.py"));
    }

    #[test]
    fn mode_switch_takes_effect() {
        let p = pipeline(TranscriptionMode::Programmer);
        p.set_transcription_mode(TranscriptionMode::Normal);
        assert!(!p.programmer_mode_enabled());
        let out = p.process_transcript("please update function.py file");
        assert!(!out.contains('@'));
    }

    // ---- Question preservation ---------------------------------------------

    #[test]
    fn dictated_question_stays_a_question() {
        let p = pipeline(TranscriptionMode::Programmer);
        let out = p.process_transcript("what is polymorphism in oop");
        assert_eq!(out, "What is polymorphism in OOP?");
    }

    // ---- Self-correction ---------------------------------------------------

    #[test]
    fn backtracked_file_mention_resolves_to_final_target() {
        let p = pipeline(TranscriptionMode::Programmer);
        let out = p.process_transcript(
            "okay we have a problem in the app i want to modify functions file no no modify text refiner file",
        );
        let lower = out.to_lowercase();
        assert!(lower.contains("@text_refiner"));
        assert!(!lower.contains("@functions"));
    }

    // ---- Completeness ------------------------------------------------------

    #[test]
    fn long_dictation_word_count_is_preserved() {
        let p = pipeline(TranscriptionMode::Programmer);
        let raw = "we are setting things up and it is good to go but we still need to check \
                   if it actually worked and keep writing more sentences while tracking bugs \
                   that still need fixes before the release lands tomorrow morning";
        let out = p.process_transcript(raw);
        let raw_words = raw.split_whitespace().count();
        let out_words = out.split_whitespace().count();
        assert!(
            out_words as f32 >= 0.78 * raw_words as f32,
            "cleanup dropped too much: {out_words}/{raw_words}"
        );
    }
}

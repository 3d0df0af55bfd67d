//! Model-fallback router: tries an ordered list of model candidates and
//! swaps the active engine on success.
//!
//! Candidate order follows `[active, configured, primary, max-accuracy,
//! safe-fallback]`, deduplicated.  At warm-up time the router prefers a
//! locally cached primary model over an uncached max-accuracy model so the
//! first dictation is not blocked behind a multi-gigabyte download.

use crate::config::{CleanupMode, DEFAULT_SAFE_FALLBACK_MODEL};
use crate::models::ModelCache;
use crate::stt::chunking::{
    is_tail_covered, merge_transcript_parts, needs_chunked_decoding, needs_tail_pass,
    split_for_long_transcription, tail_window,
};
use crate::stt::engine::{SttBackend, SttError, WhisperEngine};
use crate::stt::transcribe::temperature_ladder;

/// Builds an engine for a `(model_id, language)` pair.
pub type EngineFactory =
    Box<dyn Fn(&str, &str) -> Result<Box<dyn SttBackend>, SttError> + Send + Sync>;
/// Answers "is this model already on disk?".
pub type CachedProbe = Box<dyn Fn(&str) -> bool + Send + Sync>;

// ---------------------------------------------------------------------------
// SttRouter
// ---------------------------------------------------------------------------

pub struct SttRouter {
    active: Option<Box<dyn SttBackend>>,
    primary_model: String,
    max_accuracy_model: String,
    cleanup_mode: CleanupMode,
    language: String,
    factory: EngineFactory,
    cached: CachedProbe,
}

impl SttRouter {
    /// Production router over the on-disk model cache.
    pub fn new(
        cache: ModelCache,
        primary_model: String,
        max_accuracy_model: String,
        language: String,
        cleanup_mode: CleanupMode,
    ) -> Self {
        let factory_cache = cache.clone();
        let factory: EngineFactory = Box::new(move |model_id, language| {
            let path = factory_cache.stt_model_path(model_id);
            let engine = WhisperEngine::load(model_id, path, language)?;
            Ok(Box::new(engine) as Box<dyn SttBackend>)
        });
        let cached: CachedProbe = Box::new(move |model_id| cache.is_stt_model_cached(model_id));

        Self::with_parts(
            factory,
            cached,
            primary_model,
            max_accuracy_model,
            language,
            cleanup_mode,
        )
    }

    /// Router from explicit parts — the seam the tests use.
    pub fn with_parts(
        factory: EngineFactory,
        cached: CachedProbe,
        primary_model: String,
        max_accuracy_model: String,
        language: String,
        cleanup_mode: CleanupMode,
    ) -> Self {
        Self {
            active: None,
            primary_model,
            max_accuracy_model,
            cleanup_mode,
            language,
            factory,
            cached,
        }
    }

    /// Model the current cleanup mode asks for.
    fn configured_model(&self) -> &str {
        if self.cleanup_mode == CleanupMode::MaxAccuracy {
            &self.max_accuracy_model
        } else {
            &self.primary_model
        }
    }

    /// Identifier of the currently active engine, if any.
    pub fn active_model(&self) -> Option<&str> {
        self.active.as_deref().map(SttBackend::model_id)
    }

    /// Ordered, deduplicated candidate list.
    ///
    /// For warm-up, when max-accuracy is configured but not cached while
    /// the primary is, the primary leads so startup stays responsive.
    pub fn fallback_candidates(&self, for_warm_up: bool) -> Vec<String> {
        let mut list: Vec<String> = Vec::new();

        let prefer_cached_primary = for_warm_up
            && self.configured_model() == self.max_accuracy_model
            && !(self.cached)(&self.max_accuracy_model)
            && (self.cached)(&self.primary_model);
        if prefer_cached_primary {
            list.push(self.primary_model.clone());
        }

        if let Some(active) = self.active_model() {
            list.push(active.to_string());
        }
        list.push(self.configured_model().to_string());
        list.push(self.primary_model.clone());
        list.push(self.max_accuracy_model.clone());
        list.push(DEFAULT_SAFE_FALLBACK_MODEL.to_string());

        let mut deduped: Vec<String> = Vec::new();
        for model in list {
            if !deduped.contains(&model) {
                deduped.push(model);
            }
        }
        deduped
    }

    /// Warm up the first candidate that loads, swapping it in as active.
    pub fn warm_up_with_fallback(&mut self) -> Result<(), SttError> {
        let mut failures: Vec<String> = Vec::new();

        for model in self.fallback_candidates(true) {
            let engine = match self.engine_for(&model) {
                Ok(engine) => engine,
                Err(e) => {
                    failures.push(format!("{model}: {e}"));
                    continue;
                }
            };
            match engine.warm_up() {
                Ok(()) => {
                    if self.active_model() != Some(model.as_str()) {
                        log::info!("STT active model: {model}");
                    }
                    self.active = Some(engine);
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("STT warm-up failed for {model}: {e}");
                    failures.push(format!("{model}: {e}"));
                }
            }
        }

        Err(SttError::AllModelsFailed {
            summary: failures.join("; "),
        })
    }

    /// Transcribe with the active engine, falling through the candidate
    /// chain on failure.  The successful engine becomes active.
    pub fn transcribe_with_fallback(
        &mut self,
        audio: &[f32],
        hint: &str,
        temperatures: &[f32],
    ) -> Result<String, SttError> {
        let mut failures: Vec<String> = Vec::new();

        for (attempt, model) in self.fallback_candidates(false).into_iter().enumerate() {
            let reuse_active = self.active_model() == Some(model.as_str());
            let engine = if reuse_active {
                self.active.take().expect("active engine present")
            } else {
                match self.engine_for(&model) {
                    Ok(engine) => {
                        // A freshly constructed fallback engine is warmed
                        // before the retry so its first decode is real.
                        if let Err(e) = engine.warm_up() {
                            failures.push(format!("{model}: {e}"));
                            continue;
                        }
                        engine
                    }
                    Err(e) => {
                        failures.push(format!("{model}: {e}"));
                        continue;
                    }
                }
            };

            match engine.transcribe(audio, hint, temperatures) {
                Ok(text) => {
                    if attempt > 0 {
                        log::warn!("Transcription succeeded on fallback model {model}");
                    }
                    self.active = Some(engine);
                    return Ok(text);
                }
                Err(e) => {
                    log::warn!("Transcription failed on {model}: {e}");
                    failures.push(format!("{model}: {e}"));
                }
            }
        }

        Err(SttError::AllModelsFailed {
            summary: failures.join("; "),
        })
    }

    /// Full adaptive transcription: temperature ladder per clip length,
    /// chunked decoding with overlap stitching for long audio, and the
    /// tail-pass for very long recordings.
    pub fn transcribe_adaptive(&mut self, audio: &[f32], hint: &str) -> Result<String, SttError> {
        if !needs_chunked_decoding(audio) {
            let ladder = temperature_ladder(audio.len());
            return self.transcribe_with_fallback(audio, hint, ladder);
        }

        let chunks = split_for_long_transcription(audio);
        log::info!(
            "Chunked decoding: {} chunks over {:.1}s",
            chunks.len(),
            audio.len() as f32 / 16_000.0
        );

        let mut parts: Vec<String> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let ladder = temperature_ladder(chunk.len());
            parts.push(self.transcribe_with_fallback(chunk, hint, ladder)?);
        }
        let mut merged = merge_transcript_parts(&parts);

        if needs_tail_pass(audio) {
            let tail = tail_window(audio);
            let ladder = temperature_ladder(tail.len());
            let tail_text = self.transcribe_with_fallback(tail, hint, ladder)?;
            if !is_tail_covered(&merged, &tail_text) {
                log::info!("Tail-pass recovered uncovered audio tail");
                merged = merge_transcript_parts(&[merged, tail_text]);
            }
        }

        Ok(merged)
    }

    /// Drop the active engine, releasing its model weights.
    ///
    /// Must never run on the audio callback path — freeing gigabytes of
    /// weights takes real time.  The next warm-up or transcription rebuilds
    /// an engine from the candidate chain.
    pub fn unload(&mut self) {
        if let Some(model) = self.active_model() {
            log::info!("Unloading STT model {model}");
        }
        self.active = None;
    }

    /// Switch the decode language on the active engine and all future ones.
    pub fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
        if let Some(active) = self.active.as_mut() {
            active.set_language(language);
        }
    }

    /// Switch cleanup mode; a changed configured model drops the active
    /// engine so the next warm-up or transcription loads the right one.
    pub fn set_cleanup_mode(&mut self, mode: CleanupMode) {
        self.cleanup_mode = mode;
        if self.active_model().is_some_and(|m| m != self.configured_model()) {
            log::info!("Configured STT model changed; active engine will be rebuilt");
            self.active = None;
        }
    }

    fn engine_for(&self, model: &str) -> Result<Box<dyn SttBackend>, SttError> {
        (self.factory)(model, &self.language)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

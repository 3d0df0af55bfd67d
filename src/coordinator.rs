//! Dictation coordinator: ties hotkey events to capture, the pipeline,
//! target-app focus restoration, and paste.
//!
//! Runs on a dedicated thread (the cpal stream handle is not `Send`), with
//! one worker thread spawned per utterance for the pipeline.  Concurrent
//! dictations are prevented by the `processing` flag: a hotkey press while
//! a previous utterance is still in flight is dropped, not queued —
//! queueing would interleave clipboard writes and paste keystrokes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::audio::{rms, AudioCapture};
use crate::hotkey::HotkeyEvent;
use crate::inject::{InsertError, TextInserter};
use crate::pipeline::TranscriptionPipeline;
use crate::platform;
use crate::signals::{transcript_for_log, AppSignal, SignalHub};

/// Utterances shorter than this (0.3 s at 16 kHz) are noise, not speech.
pub const MIN_AUDIO_SAMPLES: usize = 4_800;
/// Overall RMS below this means the recording was silence.
pub const MIN_OVERALL_RMS: f32 = 0.003;
/// Pause after reactivating the target app, letting the OS finish the
/// switch before the paste keystroke fires.
const APP_SWITCH_SETTLE: Duration = Duration::from_millis(150);

// ---------------------------------------------------------------------------
// DictationCoordinator
// ---------------------------------------------------------------------------

pub struct DictationCoordinator {
    audio: AudioCapture,
    pipeline: Arc<TranscriptionPipeline>,
    inserter: Arc<TextInserter>,
    signals: SignalHub,
    processing: Arc<AtomicBool>,
    target_pid: Option<i32>,
}

impl DictationCoordinator {
    pub fn new(
        pipeline: Arc<TranscriptionPipeline>,
        inserter: Arc<TextInserter>,
        signals: SignalHub,
    ) -> Self {
        Self {
            audio: AudioCapture::new(),
            pipeline,
            inserter,
            signals,
            processing: Arc::new(AtomicBool::new(false)),
            target_pid: None,
        }
    }

    /// Drive the dictation lifecycle until the hotkey channel closes.
    ///
    /// Call from a dedicated thread — this blocks.
    pub fn run(mut self, mut hotkey_rx: mpsc::Receiver<HotkeyEvent>) {
        while let Some(event) = hotkey_rx.blocking_recv() {
            match event {
                HotkeyEvent::RecordingStart => self.on_recording_start(),
                HotkeyEvent::RecordingStop { cancelled } => self.on_recording_stop(cancelled),
            }
        }
        log::info!("Hotkey channel closed; coordinator shutting down");
    }

    fn on_recording_start(&mut self) {
        if self.processing.load(Ordering::SeqCst) {
            log::debug!("Still processing previous utterance; ignoring new recording");
            return;
        }

        // Remember where the paste should land — unless we are frontmost
        // ourselves, in which case there is nothing to restore.
        self.target_pid = platform::frontmost_app_pid().filter(|&pid| pid != platform::own_pid());

        self.audio.drain();
        if let Err(e) = self.audio.start() {
            log::error!("Failed to start microphone capture: {e}");
            self.signals.error(
                "Microphone error",
                "Unable to start audio capture. Check microphone permission.",
            );
            return;
        }

        log::info!("Recording started");
        self.signals.emit(AppSignal::RecordingStarted);
        self.signals.status("Recording");
    }

    fn on_recording_stop(&mut self, cancelled: bool) {
        if !self.audio.is_active() {
            return; // duplicate key event
        }

        let waveform = self.audio.stop(None);
        self.signals.emit(AppSignal::RecordingStopped);

        if cancelled {
            log::info!("Recording cancelled (hold too short)");
            self.signals.status("Ready");
            return;
        }
        if waveform.len() < MIN_AUDIO_SAMPLES {
            log::info!("Audio too short ({} samples); discarding", waveform.len());
            self.signals.status("Ready");
            return;
        }
        if rms(&waveform) < MIN_OVERALL_RMS {
            log::info!("Recording was silence; discarding");
            self.signals.status("Ready");
            return;
        }

        log::info!(
            "Recording stopped; captured {} samples ({:.1}s)",
            waveform.len(),
            waveform.len() as f32 / 16_000.0
        );
        self.signals.status("Processing");
        self.processing.store(true, Ordering::SeqCst);

        let pipeline = Arc::clone(&self.pipeline);
        let inserter = Arc::clone(&self.inserter);
        let signals = self.signals.clone();
        let processing = Arc::clone(&self.processing);
        let target_pid = self.target_pid.take();

        std::thread::Builder::new()
            .name("utterance-worker".into())
            .spawn(move || {
                process_utterance(waveform, pipeline, inserter, signals, &processing, target_pid);
            })
            .expect("failed to spawn utterance worker");
    }
}

/// Worker-thread body: pipeline → focus restore → paste.
///
/// The `processing` flag is released only after the paste completes, so a
/// follow-up dictation can never race this one's clipboard writes.
fn process_utterance(
    waveform: Vec<f32>,
    pipeline: Arc<TranscriptionPipeline>,
    inserter: Arc<TextInserter>,
    signals: SignalHub,
    processing: &AtomicBool,
    target_pid: Option<i32>,
) {
    let result = pipeline.process(&waveform);
    drop(waveform);

    let text = match result {
        Ok(text) => text,
        Err(e) => {
            log::error!("Transcription failed: {e}");
            signals.error("Transcription failed", e.to_string());
            processing.store(false, Ordering::SeqCst);
            return;
        }
    };

    if text.is_empty() {
        log::info!("Pipeline produced no text (silence or filtered output)");
        signals.status("Ready");
        processing.store(false, Ordering::SeqCst);
        return;
    }

    log::info!("Transcription result: {}", transcript_for_log(&text));
    signals.emit(AppSignal::TranscriptionComplete(text.clone()));

    restore_target_focus(target_pid);

    match inserter.insert(&text) {
        Ok(()) => {
            signals.status("Ready");
        }
        Err(InsertError::AccessibilityRequired) => {
            signals.status("Paste permission required");
            signals.error(
                "Paste permission required",
                "Text was copied to the clipboard — enable Accessibility to auto-paste, \
                 or paste now with the keyboard.",
            );
        }
        Err(e) => {
            log::warn!("Paste failed: {e}");
            signals.error("Paste failed", e.to_string());
        }
    }

    processing.store(false, Ordering::SeqCst);
}

/// Reactivate the remembered target app and give the OS a moment to
/// finish the switch.  Skips our own process; retries once when the app
/// did not come frontmost on the first attempt.
fn restore_target_focus(target_pid: Option<i32>) {
    let Some(pid) = target_pid else {
        return;
    };
    if pid == platform::own_pid() {
        return;
    }

    platform::activate_app(pid);
    std::thread::sleep(APP_SWITCH_SETTLE);

    if !platform::app_is_frontmost(pid) {
        log::debug!("Target app {pid} not frontmost yet; retrying activation");
        platform::activate_app(pid);
        std::thread::sleep(APP_SWITCH_SETTLE);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_utterance_is_300ms() {
        // 0.3 s at 16 kHz.
        assert_eq!(MIN_AUDIO_SAMPLES, 4_800);
    }

    #[test]
    fn silence_guard_threshold_rejects_near_silence() {
        let silence = vec![0.0005_f32; 16_000];
        assert!(rms(&silence) < MIN_OVERALL_RMS);
        let speech = vec![0.02_f32; 16_000];
        assert!(rms(&speech) >= MIN_OVERALL_RMS);
    }
}

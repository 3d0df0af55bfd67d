//! Application-wide signal hub for status and progress updates.
//!
//! All backend-to-frontend communication goes through [`SignalHub`] so no
//! backend module needs to know anything about the UI collaborators (tray,
//! overlay, settings window) that may be listening.  Emission never blocks
//! and never fails: with no subscribers the signal is simply dropped.

use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// AppSignal
// ---------------------------------------------------------------------------

/// One status/progress event, delivered to every subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum AppSignal {
    /// Microphone capture has started.
    RecordingStarted,
    /// Microphone capture has stopped (utterance finalised or discarded).
    RecordingStopped,
    /// Human-readable status line ("Recording", "Processing", "Ready", ...).
    StatusChanged(String),
    /// A model has started loading/downloading.
    ModelLoading(String),
    /// A model finished loading and is ready for inference.
    ModelLoaded(String),
    /// The pipeline produced final text for an utterance.
    TranscriptionComplete(String),
    /// A user-visible error.
    ErrorOccurred { title: String, message: String },
}

// ---------------------------------------------------------------------------
// SignalHub
// ---------------------------------------------------------------------------

/// Cheaply clonable broadcast hub.
///
/// ```rust
/// use whisperkey::signals::{AppSignal, SignalHub};
///
/// let hub = SignalHub::new();
/// let mut rx = hub.subscribe();
/// hub.emit(AppSignal::StatusChanged("Ready".into()));
/// assert_eq!(rx.try_recv().unwrap(), AppSignal::StatusChanged("Ready".into()));
/// ```
#[derive(Debug, Clone)]
pub struct SignalHub {
    tx: broadcast::Sender<AppSignal>,
}

impl SignalHub {
    /// Buffered capacity per subscriber; slow subscribers lose the oldest
    /// signals rather than blocking the pipeline.
    const CAPACITY: usize = 64;

    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(Self::CAPACITY);
        Self { tx }
    }

    /// Subscribe to all signals emitted from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<AppSignal> {
        self.tx.subscribe()
    }

    /// Emit a signal to all current subscribers (no-op without any).
    pub fn emit(&self, signal: AppSignal) {
        let _ = self.tx.send(signal);
    }

    /// Convenience wrapper for the common status-line update.
    pub fn status(&self, text: impl Into<String>) {
        self.emit(AppSignal::StatusChanged(text.into()));
    }

    /// Convenience wrapper for user-visible errors.
    pub fn error(&self, title: impl Into<String>, message: impl Into<String>) {
        self.emit(AppSignal::ErrorOccurred {
            title: title.into(),
            message: message.into(),
        });
    }
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Transcript logging
// ---------------------------------------------------------------------------

/// Render a transcript for a log line.
///
/// Dictated text is private by default: log lines carry only the length
/// unless the `LOG_TRANSCRIPTS` environment variable is truthy.
pub fn transcript_for_log(text: &str) -> String {
    if log_transcripts_enabled() {
        text.to_string()
    } else {
        format!("<{} chars>", text.chars().count())
    }
}

fn log_transcripts_enabled() -> bool {
    match std::env::var("LOG_TRANSCRIPTS") {
        Ok(v) => {
            let v = v.trim().to_ascii_lowercase();
            !v.is_empty() && v != "0" && v != "false" && v != "no"
        }
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Key-hold state machine and the dedicated `rdev` listener thread.
//!
//! `rdev::listen` is a blocking OS-level call that never returns while the
//! process is alive, so it runs on its own OS thread.  Dropping the
//! [`HotkeyListener`] sets a stop flag; the callback then discards further
//! events (rdev has no graceful shutdown API, the blocked thread simply
//! stays parked until process exit).
//!
//! The decision logic lives in [`KeyStateMachine`], which is pure over
//! `(event, timestamp)` pairs and fully testable without an OS hook.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;

use crate::config::RecordingMode;

use super::HotkeyEvent;

// ---------------------------------------------------------------------------
// KeyStateMachine
// ---------------------------------------------------------------------------

/// Pure hold/toggle state machine for one configured key.
///
/// Push-to-talk: press starts recording; release before `min_hold_ms`
/// cancels, otherwise stops normally.  OS key-repeat presses while held
/// are dropped.
///
/// Toggle: the first press arms a double-press window; a second press
/// inside the window toggles recording.  Isolated presses decay.
pub struct KeyStateMachine {
    mode: RecordingMode,
    min_hold_ms: u64,
    double_press_window_ms: u64,

    key_held: bool,
    press_at: Option<Instant>,

    toggle_armed: bool,
    last_press_at: Option<Instant>,
    recording: bool,
}

impl KeyStateMachine {
    pub fn new(mode: RecordingMode, min_hold_ms: u64, double_press_window_ms: u64) -> Self {
        Self {
            mode,
            min_hold_ms,
            double_press_window_ms,
            key_held: false,
            press_at: None,
            toggle_armed: false,
            last_press_at: None,
            recording: false,
        }
    }

    /// Feed a key-down of the configured key at time `now`.
    pub fn on_press(&mut self, now: Instant) -> Option<HotkeyEvent> {
        match self.mode {
            RecordingMode::PushToTalk => {
                if self.key_held {
                    return None; // OS key repeat
                }
                self.key_held = true;
                self.press_at = Some(now);
                self.recording = true;
                Some(HotkeyEvent::RecordingStart)
            }
            RecordingMode::Toggle => {
                let within_window = self
                    .last_press_at
                    .is_some_and(|last| {
                        now.duration_since(last).as_millis() as u64 <= self.double_press_window_ms
                    });
                self.last_press_at = Some(now);

                if !within_window {
                    self.toggle_armed = true;
                    return None;
                }
                if !self.toggle_armed {
                    return None;
                }

                self.toggle_armed = false;
                self.recording = !self.recording;
                if self.recording {
                    Some(HotkeyEvent::RecordingStart)
                } else {
                    Some(HotkeyEvent::RecordingStop { cancelled: false })
                }
            }
        }
    }

    /// Feed a key-up of the configured key at time `now`.
    pub fn on_release(&mut self, now: Instant) -> Option<HotkeyEvent> {
        if self.mode != RecordingMode::PushToTalk {
            return None;
        }
        if !self.key_held {
            return None;
        }
        self.key_held = false;
        let press_at = self.press_at.take()?;
        if !self.recording {
            return None;
        }
        self.recording = false;

        let held_ms = now.duration_since(press_at).as_millis() as u64;
        let cancelled = held_ms < self.min_hold_ms;
        if cancelled {
            log::debug!("Hold too short ({held_ms} ms); cancelling");
        }
        Some(HotkeyEvent::RecordingStop { cancelled })
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }
}

// ---------------------------------------------------------------------------
// HotkeyListener
// ---------------------------------------------------------------------------

/// Handle to the running listener thread.  Dropping it stops event
/// forwarding.
pub struct HotkeyListener {
    stop: Arc<AtomicBool>,
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn the dedicated OS thread watching `key` and forwarding
    /// [`HotkeyEvent`]s over `tx`.
    ///
    /// The background thread uses `blocking_send`, which is correct from a
    /// non-async context; a full channel drops the event rather than
    /// stalling the OS event hook.
    pub fn start(
        key: rdev::Key,
        mode: RecordingMode,
        min_hold_ms: u64,
        double_press_window_ms: u64,
        tx: mpsc::Sender<HotkeyEvent>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let machine = Mutex::new(KeyStateMachine::new(
            mode,
            min_hold_ms,
            double_press_window_ms,
        ));

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let result = rdev::listen(move |event| {
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }

                    let emitted = match event.event_type {
                        rdev::EventType::KeyPress(k) if k == key => {
                            machine.lock().unwrap().on_press(Instant::now())
                        }
                        rdev::EventType::KeyRelease(k) if k == key => {
                            machine.lock().unwrap().on_release(Instant::now())
                        }
                        _ => None,
                    };

                    if let Some(hotkey_event) = emitted {
                        let _ = tx.blocking_send(hotkey_event);
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {e:?}");
                }
            })
            .expect("failed to spawn hotkey-listener thread");

        Self {
            stop,
            _thread: thread,
        }
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // The OS thread stays parked inside rdev::listen until process
        // exit; it forwards nothing once the flag is set.
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn base() -> Instant {
        Instant::now()
    }

    // ---- Push-to-talk ------------------------------------------------------

    #[test]
    fn press_starts_and_long_release_stops() {
        let mut m = KeyStateMachine::new(RecordingMode::PushToTalk, 200, 300);
        let t0 = base();

        assert_eq!(m.on_press(t0), Some(HotkeyEvent::RecordingStart));
        assert!(m.is_recording());

        let stop = m.on_release(t0 + Duration::from_millis(900));
        assert_eq!(stop, Some(HotkeyEvent::RecordingStop { cancelled: false }));
        assert!(!m.is_recording());
    }

    #[test]
    fn short_hold_is_cancelled() {
        let mut m = KeyStateMachine::new(RecordingMode::PushToTalk, 200, 300);
        let t0 = base();

        m.on_press(t0);
        let stop = m.on_release(t0 + Duration::from_millis(80));
        assert_eq!(stop, Some(HotkeyEvent::RecordingStop { cancelled: true }));
    }

    #[test]
    fn hold_exactly_at_minimum_is_not_cancelled() {
        let mut m = KeyStateMachine::new(RecordingMode::PushToTalk, 200, 300);
        let t0 = base();

        m.on_press(t0);
        let stop = m.on_release(t0 + Duration::from_millis(200));
        assert_eq!(stop, Some(HotkeyEvent::RecordingStop { cancelled: false }));
    }

    #[test]
    fn key_repeat_presses_are_dropped() {
        let mut m = KeyStateMachine::new(RecordingMode::PushToTalk, 200, 300);
        let t0 = base();

        assert!(m.on_press(t0).is_some());
        assert!(m.on_press(t0 + Duration::from_millis(50)).is_none());
        assert!(m.on_press(t0 + Duration::from_millis(100)).is_none());
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut m = KeyStateMachine::new(RecordingMode::PushToTalk, 200, 300);
        assert!(m.on_release(base()).is_none());
    }

    // ---- Toggle mode -------------------------------------------------------

    #[test]
    fn double_press_toggles_recording_on_and_off() {
        let mut m = KeyStateMachine::new(RecordingMode::Toggle, 200, 300);
        let t0 = base();

        assert!(m.on_press(t0).is_none()); // arms
        assert_eq!(
            m.on_press(t0 + Duration::from_millis(150)),
            Some(HotkeyEvent::RecordingStart)
        );
        assert!(m.is_recording());

        assert!(m.on_press(t0 + Duration::from_secs(5)).is_none()); // re-arms
        assert_eq!(
            m.on_press(t0 + Duration::from_secs(5) + Duration::from_millis(100)),
            Some(HotkeyEvent::RecordingStop { cancelled: false })
        );
        assert!(!m.is_recording());
    }

    #[test]
    fn isolated_presses_decay() {
        let mut m = KeyStateMachine::new(RecordingMode::Toggle, 200, 300);
        let t0 = base();

        assert!(m.on_press(t0).is_none());
        // Second press outside the window only re-arms.
        assert!(m.on_press(t0 + Duration::from_millis(800)).is_none());
        assert!(!m.is_recording());
    }

    #[test]
    fn releases_are_ignored_in_toggle_mode() {
        let mut m = KeyStateMachine::new(RecordingMode::Toggle, 200, 300);
        let t0 = base();
        m.on_press(t0);
        assert!(m.on_release(t0 + Duration::from_millis(50)).is_none());
    }
}

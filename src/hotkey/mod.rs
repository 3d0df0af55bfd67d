//! Global push-to-talk hotkey, backed by `rdev`.
//!
//! The dictation key is a single modifier with a left/right distinction
//! (right ⌘ by default) so holding it never types anything into the
//! focused application.

pub mod listener;

pub use listener::{HotkeyListener, KeyStateMachine};

// ---------------------------------------------------------------------------
// HotkeyEvent
// ---------------------------------------------------------------------------

/// Events emitted by the hotkey listener thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The hold (or toggle) started — begin capturing audio.
    RecordingStart,
    /// The hold ended.  `cancelled` is set when the hold was shorter than
    /// the minimum — discard the audio, run nothing.
    RecordingStop { cancelled: bool },
}

// ---------------------------------------------------------------------------
// parse_hotkey
// ---------------------------------------------------------------------------

/// Parse a config hotkey name into an [`rdev::Key`].
///
/// The supported set is modifier keys with a left/right distinction.
/// Returns `None` for unknown names so callers can fall back to the
/// default.
///
/// # Examples
///
/// ```
/// use whisperkey::hotkey::parse_hotkey;
///
/// assert_eq!(parse_hotkey("right_cmd"), Some(rdev::Key::MetaRight));
/// assert_eq!(parse_hotkey("left_ctrl"), Some(rdev::Key::ControlLeft));
/// assert_eq!(parse_hotkey("escape"), None);
/// ```
pub fn parse_hotkey(name: &str) -> Option<rdev::Key> {
    match name {
        "right_cmd" => Some(rdev::Key::MetaRight),
        "left_cmd" => Some(rdev::Key::MetaLeft),
        "right_ctrl" => Some(rdev::Key::ControlRight),
        "left_ctrl" => Some(rdev::Key::ControlLeft),
        "right_shift" => Some(rdev::Key::ShiftRight),
        "left_shift" => Some(rdev::Key::ShiftLeft),
        // rdev models right Alt as AltGr.
        "right_alt" => Some(rdev::Key::AltGr),
        "left_alt" => Some(rdev::Key::Alt),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

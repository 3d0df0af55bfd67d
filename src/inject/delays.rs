//! Length-adaptive paste and restore delays.
//!
//! Target applications need time to read the clipboard before it is
//! restored — and that time grows with text length (editors with
//! plugins, terminals, Electron apps all get slower on big pastes).
//! Restoring too early pastes the *old* clipboard into the document.
//! All curves are piecewise-linear, monotonic, and saturate at a ceiling.

use std::time::Duration;

/// Fixed delay after writing the clipboard, before the paste keystroke.
pub const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Texts at least this long restore the clipboard on a detached timer so
/// the hot path returns immediately.
pub const DETACHED_RESTORE_MIN_CHARS: usize = 420;

/// Delay between the paste keystroke and any further clipboard work.
pub fn paste_delay_for_len(chars: usize) -> Duration {
    let mut secs = 0.12_f32;
    if chars > 180 {
        secs += (chars - 180) as f32 / 620.0;
    }
    if chars > 900 {
        secs = secs.max(0.95);
    }
    if chars > 2_200 {
        secs = secs.max(1.45);
    }
    Duration::from_secs_f32(secs.min(2.60))
}

/// Delay before the original clipboard contents are restored.
pub fn restore_delay_for_len(chars: usize) -> Duration {
    let mut secs = 0.08_f32;
    if chars > 180 {
        secs += (chars - 180) as f32 / 420.0;
    }
    if chars > 900 {
        secs = secs.max(1.80);
    }
    if chars > 2_200 {
        secs = secs.max(3.40);
    }
    Duration::from_secs_f32(secs.min(6.00))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

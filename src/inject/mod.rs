//! Text insertion: clipboard-save → set → paste keystroke → restore.
//!
//! Clipboard paste is the only insertion method that works reliably in
//! every application, but it turns the clipboard into shared mutable
//! state.  [`TextInserter`] therefore serializes all inserts behind a
//! process-wide lock and stamps each with a monotonic generation; the
//! restore step only runs when it is still the latest generation *and*
//! the clipboard still holds the text this paste placed there.  A stale
//! restore — after the user copied something else, or after a newer
//! dictation pasted — silently becomes a no-op.

pub mod clipboard;
pub mod delays;
pub mod keyboard;
pub mod permissions;

pub use clipboard::{restore_clipboard, save_clipboard, set_clipboard};
pub use delays::{
    paste_delay_for_len, restore_delay_for_len, DETACHED_RESTORE_MIN_CHARS, SETTLE_DELAY,
};
pub use keyboard::simulate_paste;
pub use permissions::accessibility_trusted;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

// ---------------------------------------------------------------------------
// InsertError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InsertError {
    /// Could not open or read the system clipboard.
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    /// Could not write text to the system clipboard.
    #[error("cannot set clipboard text: {0}")]
    ClipboardSet(String),

    /// Could not synthesize the paste keystroke.
    #[error("cannot simulate paste keystroke: {0}")]
    KeySimulation(String),

    /// The OS denies synthetic input; the text was left on the clipboard
    /// so the user can paste manually.
    #[error("accessibility permission required — text left on clipboard")]
    AccessibilityRequired,
}

// ---------------------------------------------------------------------------
// Restore decision
// ---------------------------------------------------------------------------

/// Pure decision for the deferred restore: only the latest generation may
/// restore, and only while the clipboard still holds the pasted text.
pub fn should_restore(
    latest_generation: u64,
    paste_generation: u64,
    clipboard_now: Option<&str>,
    pasted_text: &str,
) -> bool {
    latest_generation == paste_generation && clipboard_now == Some(pasted_text)
}

// ---------------------------------------------------------------------------
// TextInserter
// ---------------------------------------------------------------------------

/// Process-wide inserter.  Construct once at startup, share via `Arc`.
pub struct TextInserter {
    restore_clipboard: bool,
    insert_lock: Mutex<()>,
    generation: Arc<AtomicU64>,
}

impl TextInserter {
    pub fn new(restore_clipboard: bool) -> Self {
        Self {
            restore_clipboard,
            insert_lock: Mutex::new(()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Insert `text` at the cursor of the foreground application.
    ///
    /// Steps: accessibility probe → save clipboard → set text → settle →
    /// paste keystroke → length-adaptive wait → restore.  Texts of
    /// [`DETACHED_RESTORE_MIN_CHARS`] or more restore on a detached thread
    /// so the caller is not blocked for seconds; the detached timer
    /// re-checks generation and clipboard contents before acting.
    ///
    /// # Errors
    ///
    /// [`InsertError::AccessibilityRequired`] leaves `text` on the
    /// clipboard and skips the keystroke.  Clipboard and keystroke
    /// failures surface as their respective variants; in all cases the
    /// text remains on the clipboard for a manual paste.
    pub fn insert(&self, text: &str) -> Result<(), InsertError> {
        if text.is_empty() {
            return Ok(());
        }

        let _guard = self.insert_lock.lock().unwrap();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if !accessibility_trusted(false) {
            // Leave the text where the user can reach it with a manual ⌘V.
            set_clipboard(text)?;
            return Err(InsertError::AccessibilityRequired);
        }

        let saved = if self.restore_clipboard {
            save_clipboard()?
        } else {
            None
        };

        set_clipboard(text)?;
        std::thread::sleep(SETTLE_DELAY);

        simulate_paste()?;
        let chars = text.chars().count();
        std::thread::sleep(paste_delay_for_len(chars));

        if let Some(original) = saved {
            let restore_delay = restore_delay_for_len(chars);
            if chars >= DETACHED_RESTORE_MIN_CHARS {
                let latest = Arc::clone(&self.generation);
                let pasted = text.to_string();
                std::thread::Builder::new()
                    .name("clipboard-restore".into())
                    .spawn(move || {
                        std::thread::sleep(restore_delay);
                        restore_if_unchanged(&latest, generation, &pasted, original);
                    })
                    .ok();
            } else {
                std::thread::sleep(restore_delay);
                restore_if_unchanged(&self.generation, generation, text, original);
            }
        }

        Ok(())
    }
}

/// Restore `original` only when [`should_restore`] allows it.
fn restore_if_unchanged(
    latest: &AtomicU64,
    paste_generation: u64,
    pasted_text: &str,
    original: String,
) {
    let current = save_clipboard().ok().flatten();
    if !should_restore(
        latest.load(Ordering::SeqCst),
        paste_generation,
        current.as_deref(),
        pasted_text,
    ) {
        log::debug!("Skipping clipboard restore (newer paste or clipboard changed)");
        return;
    }
    if let Err(e) = restore_clipboard(Some(original)) {
        log::warn!("Clipboard restore failed: {e}");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

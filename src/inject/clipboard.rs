//! Clipboard save / set / compare / restore backed by `arboard`.
//!
//! Each function opens a short-lived [`arboard::Clipboard`] handle —
//! `arboard::Clipboard` is not `Send` on every platform and the handle is
//! cheap to create.

use arboard::Clipboard;

use super::InsertError;

/// Capture the current clipboard plain-text content.
///
/// `Ok(None)` when the clipboard is empty or holds non-text data (an
/// image, files); that is not an error.
pub fn save_clipboard() -> Result<Option<String>, InsertError> {
    let mut clipboard = open_clipboard()?;
    Ok(clipboard.get_text().ok())
}

/// Write `text` into the system clipboard, replacing whatever was there.
pub fn set_clipboard(text: &str) -> Result<(), InsertError> {
    let mut clipboard = open_clipboard()?;
    clipboard
        .set_text(text)
        .map_err(|e| InsertError::ClipboardSet(e.to_string()))
}

/// Restore a previously saved value.  `None` (nothing was saved) is a
/// no-op.
pub fn restore_clipboard(saved: Option<String>) -> Result<(), InsertError> {
    match saved {
        Some(text) => set_clipboard(&text),
        None => Ok(()),
    }
}

fn open_clipboard() -> Result<Clipboard, InsertError> {
    Clipboard::new().map_err(|e| InsertError::ClipboardAccess(e.to_string()))
}

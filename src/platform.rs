//! Frontmost-application tracking and reactivation.
//!
//! Dictation targets whichever app was focused when the hotkey went down.
//! Transcription takes seconds, and the user may have clicked elsewhere in
//! the meantime — so the coordinator remembers the target's PID at
//! recording start and reactivates it before pasting.
//!
//! Only macOS exposes the needed APIs (`NSWorkspace` /
//! `NSRunningApplication`); other platforms get no-op stubs and rely on
//! focus not having moved.

/// PID of the frontmost application, if it can be determined.
#[cfg(target_os = "macos")]
pub fn frontmost_app_pid() -> Option<i32> {
    use objc2_app_kit::NSWorkspace;
    unsafe {
        let workspace = NSWorkspace::sharedWorkspace();
        let app = workspace.frontmostApplication()?;
        Some(app.processIdentifier() as i32)
    }
}

/// Bring the application with `pid` to the front.  Returns whether the
/// activation request was accepted.
#[cfg(target_os = "macos")]
pub fn activate_app(pid: i32) -> bool {
    use objc2_app_kit::{NSApplicationActivationOptions, NSRunningApplication};
    unsafe {
        match NSRunningApplication::runningApplicationWithProcessIdentifier(pid as _) {
            Some(app) => app.activateWithOptions(
                NSApplicationActivationOptions::NSApplicationActivateIgnoringOtherApps,
            ),
            None => false,
        }
    }
}

/// Whether the application with `pid` is currently frontmost.
#[cfg(target_os = "macos")]
pub fn app_is_frontmost(pid: i32) -> bool {
    frontmost_app_pid() == Some(pid)
}

#[cfg(not(target_os = "macos"))]
pub fn frontmost_app_pid() -> Option<i32> {
    None
}

#[cfg(not(target_os = "macos"))]
pub fn activate_app(_pid: i32) -> bool {
    false
}

#[cfg(not(target_os = "macos"))]
pub fn app_is_frontmost(_pid: i32) -> bool {
    // Without focus APIs, assume focus has not moved.
    true
}

/// PID of this process, as the focus APIs report PIDs.
pub fn own_pid() -> i32 {
    std::process::id() as i32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Paste-keystroke synthesis backed by the `enigo` crate.
//!
//! | Platform | Shortcut |
//! |----------|----------|
//! | macOS    | ⌘V       |
//! | Windows  | Ctrl+V   |
//! | Linux    | Ctrl+V   |

use enigo::{Direction, Enigo, Key, Keyboard, Settings};

use super::InsertError;

/// Send the platform paste shortcut to the focused window: modifier down,
/// `V` click, modifier up.
///
/// A fresh [`Enigo`] handle is created per call — `Enigo` is not `Send`
/// and construction is cheap.
pub fn simulate_paste() -> Result<(), InsertError> {
    let mut enigo =
        Enigo::new(&Settings::default()).map_err(|e| InsertError::KeySimulation(e.to_string()))?;

    #[cfg(target_os = "macos")]
    let modifier = Key::Meta;
    #[cfg(not(target_os = "macos"))]
    let modifier = Key::Control;

    enigo
        .key(modifier, Direction::Press)
        .map_err(|e| InsertError::KeySimulation(e.to_string()))?;
    let result = enigo
        .key(Key::Unicode('v'), Direction::Click)
        .map_err(|e| InsertError::KeySimulation(e.to_string()));
    // The modifier must be released even when the V click failed, or the
    // user is left with a held Cmd/Ctrl key.
    let release = enigo
        .key(modifier, Direction::Release)
        .map_err(|e| InsertError::KeySimulation(e.to_string()));

    result.and(release)
}

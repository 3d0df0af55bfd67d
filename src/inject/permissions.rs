//! Accessibility trust probe.
//!
//! Synthesizing keystrokes requires Accessibility trust on macOS.  The
//! probe is a plain boolean; the `prompt` variant additionally asks the OS
//! to show its grant dialog.  Other platforms have no equivalent gate and
//! always report trusted.

/// Whether this process may synthesize keyboard events.
#[cfg(target_os = "macos")]
pub fn accessibility_trusted(prompt: bool) -> bool {
    use accessibility_sys::{
        kAXTrustedCheckOptionPrompt, AXIsProcessTrusted, AXIsProcessTrustedWithOptions,
    };
    use core_foundation::base::TCFType;
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFDictionary;
    use core_foundation::string::CFString;

    unsafe {
        if AXIsProcessTrusted() {
            return true;
        }
        if prompt {
            let key = CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt);
            let options = CFDictionary::from_CFType_pairs(&[(
                key.as_CFType(),
                CFBoolean::true_value().as_CFType(),
            )]);
            AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef());
            return AXIsProcessTrusted();
        }
        false
    }
}

/// Non-macOS platforms have no accessibility gate for synthetic input.
#[cfg(not(target_os = "macos"))]
pub fn accessibility_trusted(_prompt: bool) -> bool {
    true
}

//! Exported screen reader automation entry points.
//!
//! Hosts load `saapi.dll` and call these with NUL-terminated UTF-16 strings.

use crate::conversions::wide_ptr_to_slice;

/// Speak `text`. Returns `false` only when `text` is null.
///
/// # Safety
///
/// `text` must be null or a valid NUL-terminated UTF-16 string.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn SA_SayW(text: *const u16) -> bool {
    let text = wide_ptr_to_slice(text);
    crate::with_announcer(|announcer| announcer.announce_wide(text))
}

/// Show `text` on a braille display. No display is driven.
///
/// # Safety
///
/// `text` must be null or a valid NUL-terminated UTF-16 string.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn SA_BrlShowTextW(text: *const u16) -> bool {
    let text = wide_ptr_to_slice(text);
    crate::with_installed(|announcer| announcer.show_braille(text)).unwrap_or(true)
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn SA_IsRunning() -> bool {
    crate::with_installed(|announcer| announcer.is_running()).unwrap_or(true)
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn SA_StopAudio() -> bool {
    crate::with_installed(|announcer| announcer.stop_audio()).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(text: &str) -> Vec<u16> {
        text.encode_utf16().chain(std::iter::once(0)).collect()
    }

    #[test]
    fn say_null_fails() {
        assert!(!unsafe { SA_SayW(std::ptr::null()) });
    }

    #[test]
    fn say_text_always_succeeds() {
        let empty = wide("");
        let text = wide("Ancestral Unique Ring");
        assert!(unsafe { SA_SayW(empty.as_ptr()) });
        assert!(unsafe { SA_SayW(text.as_ptr()) });
        assert!(unsafe { SA_SayW(text.as_ptr()) });
    }

    #[test]
    fn stubs_report_success() {
        let text = wide("braille");
        assert!(SA_IsRunning());
        assert!(SA_StopAudio());
        assert!(unsafe { SA_BrlShowTextW(text.as_ptr()) });
        assert!(unsafe { SA_BrlShowTextW(std::ptr::null()) });
    }
}

//! Conversion helpers between the host's wide strings and the pipe payload.

use std::slice;

/// Payload framing applied to each announcement written to the pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// UTF-8 bytes only.
    #[default]
    Raw,
    /// UTF-8 bytes followed by a single NUL byte.
    NulTerminated,
}

/// Borrow a NUL-terminated UTF-16 string as a slice (terminator excluded).
///
/// Returns `None` for a null pointer.
///
/// # Safety
///
/// `ptr` must be null or point to a readable sequence of `u16` values ending
/// with a `0` code unit, valid for the lifetime `'a`.
pub unsafe fn wide_ptr_to_slice<'a>(ptr: *const u16) -> Option<&'a [u16]> {
    if ptr.is_null() {
        return None;
    }

    let mut len = 0usize;
    while *ptr.add(len) != 0 {
        len += 1;
    }

    Some(slice::from_raw_parts(ptr, len))
}

/// Decode UTF-16 into UTF-8, replacing unpaired surrogates with U+FFFD.
pub fn wide_to_utf8(wide: &[u16]) -> String {
    String::from_utf16_lossy(wide)
}

/// Build the bytes written to the pipe for one announcement.
pub fn encode_announcement(text: &str, framing: Framing) -> Vec<u8> {
    let mut payload = Vec::with_capacity(text.len() + 1);
    payload.extend_from_slice(text.as_bytes());
    if framing == Framing::NulTerminated {
        payload.push(0);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(text: &str) -> Vec<u16> {
        text.encode_utf16().chain(std::iter::once(0)).collect()
    }

    #[test]
    fn null_pointer_is_none() {
        assert!(unsafe { wide_ptr_to_slice(std::ptr::null()) }.is_none());
    }

    #[test]
    fn reads_up_to_terminator() {
        let buffer: Vec<u16> = vec![b'h' as u16, b'i' as u16, 0, b'x' as u16, 0];
        let slice = unsafe { wide_ptr_to_slice(buffer.as_ptr()) }.expect("slice expected");
        assert_eq!(wide_to_utf8(slice), "hi");
    }

    #[test]
    fn empty_wide_string_is_empty_slice() {
        let buffer = wide("");
        let slice = unsafe { wide_ptr_to_slice(buffer.as_ptr()) }.expect("slice expected");
        assert!(slice.is_empty());
    }

    #[test]
    fn surrogate_pairs_decode_to_utf8() {
        let buffer = wide("Épée 🗡");
        let slice = unsafe { wide_ptr_to_slice(buffer.as_ptr()) }.expect("slice expected");
        let text = wide_to_utf8(slice);
        assert_eq!(text, "Épée 🗡");
        assert_eq!(text.as_bytes().last(), Some(&0xA1));
    }

    #[test]
    fn lone_surrogate_is_replaced() {
        let text = wide_to_utf8(&[b'a' as u16, 0xD800, b'b' as u16]);
        assert_eq!(text, "a\u{FFFD}b");
    }

    #[test]
    fn raw_framing_adds_nothing() {
        assert_eq!(encode_announcement("hello", Framing::Raw), b"hello".to_vec());
        assert!(encode_announcement("", Framing::Raw).is_empty());
    }

    #[test]
    fn nul_framing_appends_terminator() {
        assert_eq!(
            encode_announcement("hello", Framing::NulTerminated),
            b"hello\0".to_vec()
        );
    }
}

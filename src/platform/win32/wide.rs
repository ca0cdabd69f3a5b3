// ── UTF-16 marshalling ────────────────────────────────────────────────────────
//
// The native library speaks NUL-terminated UTF-16.  Outgoing strings are
// encoded here; incoming ones are read through a caller-owned buffer that
// grows until the library's answer fits.

use std::{os::windows::ffi::OsStrExt, path::Path};

use crate::error::{ConnectorError, Result};

/// Largest output buffer offered to the library, in `WCHAR`s including the
/// terminator.  Matches the documented maximum for `\\?\` extended paths.
pub(crate) const MAX_BUF_LEN: usize = 32_768;

const INITIAL_BUF_LEN: usize = 256;

/// Encode `s` as NUL-terminated UTF-16.
pub(crate) fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Encode a path as NUL-terminated UTF-16 straight from its OS form, so
/// unpaired surrogates survive.
pub(crate) fn path_to_wide(path: &Path) -> Vec<u16> {
    path.as_os_str().encode_wide().chain(std::iter::once(0)).collect()
}

/// Call `fill(buf)` with growing buffers until the reported length fits.
///
/// `fill` returns the full length of its answer in `WCHAR`s, excluding the
/// terminator; a value `>= buf.len()` means the answer was truncated.
pub(crate) fn read_string(
    function: &'static str,
    mut fill: impl FnMut(&mut [u16]) -> usize,
) -> Result<String> {
    let mut len = INITIAL_BUF_LEN;
    loop {
        let mut buf = vec![0u16; len];
        let needed = fill(&mut buf);
        if needed < buf.len() {
            return Ok(String::from_utf16_lossy(&buf[..needed]));
        }
        if len == MAX_BUF_LEN {
            return Err(ConnectorError::NativeBufferOverflow {
                function,
                len: needed,
                max: MAX_BUF_LEN - 1,
            });
        }
        len = (needed + 1).max(len * 2).min(MAX_BUF_LEN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> impl FnMut(&mut [u16]) -> usize + '_ {
        move |buf: &mut [u16]| {
            let wide: Vec<u16> = text.encode_utf16().collect();
            let n = wide.len().min(buf.len());
            buf[..n].copy_from_slice(&wide[..n]);
            wide.len()
        }
    }

    #[test]
    fn to_wide_appends_terminator() {
        assert_eq!(to_wide("ab"), vec![b'a' as u16, b'b' as u16, 0]);
    }

    #[test]
    fn path_keeps_unpaired_surrogate() {
        use std::{ffi::OsString, os::windows::ffi::OsStringExt, path::PathBuf};

        let raw = [b'C' as u16, b':' as u16, b'\\' as u16, 0xD800, b'x' as u16];
        let path = PathBuf::from(OsString::from_wide(&raw));
        let wide = path_to_wide(&path);
        assert_eq!(wide[..raw.len()], raw);
        assert_eq!(wide.last(), Some(&0));
    }

    #[test]
    fn short_answer_fits_first_buffer() {
        let mut calls = 0;
        let mut fill = answer("java#2");
        let s = read_string("pc_get_instance_name", |buf| {
            calls += 1;
            fill(buf)
        })
        .unwrap();
        assert_eq!(s, "java#2");
        assert_eq!(calls, 1);
    }

    #[test]
    fn long_answer_grows_buffer() {
        let long = "x".repeat(1000);
        let s = read_string("pc_add_counter", answer(&long)).unwrap();
        assert_eq!(s, long);
    }

    #[test]
    fn empty_answer_is_empty_string() {
        assert_eq!(read_string("pc_get_instance_name", answer("")).unwrap(), "");
    }

    #[test]
    fn oversized_answer_is_an_error() {
        let err = read_string("pc_add_counter", |_buf: &mut [u16]| MAX_BUF_LEN).unwrap_err();
        assert!(matches!(err, ConnectorError::NativeBufferOverflow { function: "pc_add_counter", .. }));
    }
}

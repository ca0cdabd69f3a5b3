// ── Central error type ────────────────────────────────────────────────────────
//
// All fallible operations in the bridge return `error::Result<T>`.
// `Connector::initialize` is the one place that collapses these into a
// boolean; every other entry point hands them to the caller untouched.

use std::num::ParseIntError;

use thiserror::Error;

/// Every error that the bridge can produce.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The host OS is not the one the native library targets.
    #[error("performance counter connector is only used on Windows (running on {os})")]
    UnsupportedPlatform { os: String },

    /// Only the 64-bit native library variant exists.
    #[error("no native library for a {bits}-bit process; only 64-bit is supported")]
    UnsupportedArchitecture { bits: u32 },

    /// A Win32 API call returned a failure code.
    #[error("{function} failed (error {code:#010x})")]
    Win32 {
        /// The name of the failing function, for display purposes.
        function: &'static str,
        /// The raw Win32 error code (`GetLastError()` value) or HRESULT.
        code: u32,
    },

    /// The library loaded but does not export a required entry point.
    #[error("native library `{library}` does not export `{symbol}`")]
    MissingSymbol { library: String, symbol: &'static str },

    /// No native library can be loaded on this target at all.
    #[error("native library `{library}` is not available: {reason}")]
    Unavailable { library: String, reason: String },

    /// The system information provider returned a non-numeric process id.
    #[error("invalid process id {value:?}: {source}")]
    ProcessId {
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// A required string argument was empty.
    #[error("{argument} must be a non-empty string")]
    InvalidArgument { argument: &'static str },

    /// `__SELF__` was requested but no instance name was ever resolved.
    #[error("cannot translate instance name: unknown current instance name")]
    UnresolvedSelfInstance,

    /// A delegating call was made before a successful `initialize`.
    #[error("performance counter connector is not initialized")]
    NotInitialized,

    /// A native string result did not fit the largest buffer we offer.
    #[error("{function} returned {len} characters, more than the {max} supported")]
    NativeBufferOverflow {
        function: &'static str,
        len: usize,
        max: usize,
    },

    /// A standard I/O error (config file open, read, …).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document is not valid JSON for `ConnectorConfig`.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration document was written for another format version.
    #[error("unsupported configuration version {found} (expected {expected})")]
    ConfigVersion { found: u32, expected: u32 },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win32_code_is_hex_padded() {
        let e = ConnectorError::Win32 { function: "LoadLibraryW", code: 0x7e };
        assert_eq!(e.to_string(), "LoadLibraryW failed (error 0x0000007e)");
    }

    #[test]
    fn process_id_error_keeps_source() {
        let source = "abc".parse::<i32>().unwrap_err();
        let e = ConnectorError::ProcessId { value: "abc".to_owned(), source };
        assert!(std::error::Error::source(&e).is_some());
        assert!(e.to_string().starts_with("invalid process id \"abc\""));
    }

    #[test]
    fn invalid_argument_names_the_argument() {
        let e = ConnectorError::InvalidArgument { argument: "category" };
        assert_eq!(e.to_string(), "category must be a non-empty string");
    }
}

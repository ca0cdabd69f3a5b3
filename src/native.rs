// ── Native library seam ───────────────────────────────────────────────────────
//
// The connector talks to the native performance counter library only through
// these two traits.  `platform::SystemLoader` is the production loader; tests
// supply their own.  No `unsafe` lives here.

use std::path::Path;

use crate::error::Result;

/// Base name of the only native library variant that ships (64-bit Windows).
pub const NATIVE_LIBRARY_64: &str = "applicationinsights-core-native-win64";

/// The three entry points exported by the native library.
///
/// Implementations forward verbatim.  What an unknown category or a stale
/// counter name produces is up to the library; callers receive it unchanged.
pub trait NativeCounters: Send + Sync {
    /// Resolve a process id into its performance-counter instance name.
    /// An empty string means the library could not resolve it.
    fn instance_name(&self, process_id: i32) -> Result<String>;

    /// Register `\category(instance)\counter` and return the opaque name used
    /// for later reads.
    fn add_counter(&self, category: &str, counter: &str, instance: Option<&str>) -> Result<String>;

    /// Current value of a counter previously returned by `add_counter`.
    fn counter_value(&self, name: &str) -> Result<f64>;
}

/// Loads the native library by file name or path.
///
/// The path is handed over as configured; loaders must not re-encode it
/// through UTF-8.
pub trait NativeLoader: Send + Sync {
    fn load(&self, library: &Path) -> Result<Box<dyn NativeCounters>>;
}

// ── Platform abstraction layer ────────────────────────────────────────────────
//
// This module defines the loader the rest of the codebase uses to reach the
// native library.  No `unsafe` lives here; all Win32 FFI is confined to the
// `win32` sub-module and never leaks outward.

#[cfg(windows)]
pub mod win32;

use std::path::Path;

use crate::{
    error::Result,
    native::{NativeCounters, NativeLoader},
};

/// The production [`NativeLoader`] for the build target.
///
/// On Windows it loads the DLL and binds its exports; everywhere else it
/// reports the library as unavailable without touching the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLoader;

#[cfg(windows)]
impl NativeLoader for SystemLoader {
    fn load(&self, library: &Path) -> Result<Box<dyn NativeCounters>> {
        let library = win32::library::NativeLibrary::load(library)?;
        Ok(Box::new(library))
    }
}

#[cfg(not(windows))]
impl NativeLoader for SystemLoader {
    fn load(&self, library: &Path) -> Result<Box<dyn NativeCounters>> {
        Err(crate::error::ConnectorError::Unavailable {
            library: library.display().to_string(),
            reason: format!("no native counter library for {}", std::env::consts::OS),
        })
    }
}

// ── Native counter DLL ────────────────────────────────────────────────────────
//
// Every `unsafe` block MUST carry a `// SAFETY:` comment.
//
// ── Ownership model ───────────────────────────────────────────────────────────
//
// `Module` owns the single `LoadLibraryW` call.  `NativeLibrary` holds the
// `Module` plus the three function pointers resolved from it, so the pointers
// can never outlive the code they point into.  A connector keeps its
// `NativeLibrary` until it is dropped; the process-wide connector never is,
// which matches a JVM-style `loadLibrary` that is never undone.
//
// ── Exported ABI ──────────────────────────────────────────────────────────────
//
//   u32 pc_get_instance_name(i32 pid, u16* buf, u32 buf_len);
//   u32 pc_add_counter(const u16* category, const u16* counter,
//                      const u16* instance /* nullable */, u16* buf, u32 buf_len);
//   f64 pc_get_counter_value(const u16* name);
//
// Strings are NUL-terminated UTF-16.  The `u32` results are the full answer
// length (see `wide::read_string`).

#![allow(unsafe_code)]

use std::path::Path;

use windows::{
    core::{s, PCSTR, PCWSTR},
    Win32::{
        Foundation::HMODULE,
        System::LibraryLoader::{FreeLibrary, GetProcAddress, LoadLibraryW},
    },
};

use super::wide::{path_to_wide, read_string, to_wide};
use crate::{
    error::{ConnectorError, Result},
    native::NativeCounters,
};

type GetInstanceNameFn = unsafe extern "C" fn(process_id: i32, buf: *mut u16, buf_len: u32) -> u32;
type AddCounterFn = unsafe extern "C" fn(
    category: *const u16,
    counter: *const u16,
    instance: *const u16,
    buf: *mut u16,
    buf_len: u32,
) -> u32;
type GetCounterValueFn = unsafe extern "C" fn(name: *const u16) -> f64;

// ── Module ────────────────────────────────────────────────────────────────────

/// RAII handle to the loaded DLL.  `FreeLibrary` is called on `Drop`.
struct Module(HMODULE);

impl Module {
    fn load(library: &Path) -> Result<Self> {
        let path = path_to_wide(library);
        // SAFETY: path is a valid null-terminated UTF-16 string that outlives
        // the call.  A bare file name is resolved with the standard DLL search
        // order; configure `library_dir` to pin an absolute path.
        let module = unsafe { LoadLibraryW(PCWSTR(path.as_ptr())) }.map_err(|e| {
            ConnectorError::Win32 { function: "LoadLibraryW", code: e.code().0 as u32 }
        })?;
        Ok(Self(module))
    }

    /// Resolve an export, or report it missing.
    fn symbol(
        &self,
        library: &Path,
        name: PCSTR,
        symbol: &'static str,
    ) -> Result<unsafe extern "system" fn() -> isize> {
        // SAFETY: self.0 is a live module handle and `name` is a static
        // null-terminated ANSI string produced by `s!`.
        unsafe { GetProcAddress(self.0, name) }.ok_or_else(|| ConnectorError::MissingSymbol {
            library: library.display().to_string(),
            symbol,
        })
    }
}

impl Drop for Module {
    fn drop(&mut self) {
        // SAFETY: self.0 was returned by a successful LoadLibraryW and has not
        // been freed since.  `NativeLibrary` drops its function pointers
        // together with this handle, so nothing can call into the module
        // after this point.
        unsafe {
            let _ = FreeLibrary(self.0);
        }
    }
}

// ── NativeLibrary ─────────────────────────────────────────────────────────────

/// The loaded native counter library with its three exports bound.
pub struct NativeLibrary {
    get_instance_name: GetInstanceNameFn,
    add_counter: AddCounterFn,
    get_counter_value: GetCounterValueFn,
    _module: Module,
}

// SAFETY: the module handle is a process-global value, not tied to the loading
// thread.  The exports are assumed callable from any thread: the library is
// opaque, and concurrent callers are part of the connector's contract, so a
// library that is not thread-safe breaks that contract on its side.
unsafe impl Send for NativeLibrary {}
// SAFETY: see `Send`; `NativeLibrary` holds no Rust-side mutable state.
unsafe impl Sync for NativeLibrary {}

impl NativeLibrary {
    /// Load `library` and bind `pc_get_instance_name`, `pc_add_counter` and
    /// `pc_get_counter_value`.  A missing export is a load failure; the
    /// module is released again before the error is returned.
    pub fn load(library: &Path) -> Result<Self> {
        let module = Module::load(library)?;

        let get_instance_name = module.symbol(library, s!("pc_get_instance_name"), "pc_get_instance_name")?;
        let add_counter = module.symbol(library, s!("pc_add_counter"), "pc_add_counter")?;
        let get_counter_value = module.symbol(library, s!("pc_get_counter_value"), "pc_get_counter_value")?;

        // SAFETY: the exports are declared in the native library's header with
        // exactly these C signatures (see the ABI block above).  Transmuting a
        // FARPROC to the real signature is the documented way to call it.
        let (get_instance_name, add_counter, get_counter_value) = unsafe {
            (
                std::mem::transmute::<unsafe extern "system" fn() -> isize, GetInstanceNameFn>(
                    get_instance_name,
                ),
                std::mem::transmute::<unsafe extern "system" fn() -> isize, AddCounterFn>(add_counter),
                std::mem::transmute::<unsafe extern "system" fn() -> isize, GetCounterValueFn>(
                    get_counter_value,
                ),
            )
        };

        Ok(Self {
            get_instance_name,
            add_counter,
            get_counter_value,
            _module: module,
        })
    }
}

impl NativeCounters for NativeLibrary {
    fn instance_name(&self, process_id: i32) -> Result<String> {
        read_string("pc_get_instance_name", |buf| {
            // SAFETY: buf is a live, writable slice of exactly `buf.len()`
            // WCHARs; the export writes at most `buf_len` units into it.
            unsafe { (self.get_instance_name)(process_id, buf.as_mut_ptr(), buf.len() as u32) as usize }
        })
    }

    fn add_counter(&self, category: &str, counter: &str, instance: Option<&str>) -> Result<String> {
        let category = to_wide(category);
        let counter = to_wide(counter);
        let instance = instance.map(to_wide);
        let instance_ptr = instance.as_ref().map_or(std::ptr::null(), |w| w.as_ptr());

        read_string("pc_add_counter", |buf| {
            // SAFETY: the three inputs are null-terminated UTF-16 buffers (or
            // null for an absent instance) that outlive the call; buf is a
            // live, writable slice of exactly `buf.len()` WCHARs.
            unsafe {
                (self.add_counter)(
                    category.as_ptr(),
                    counter.as_ptr(),
                    instance_ptr,
                    buf.as_mut_ptr(),
                    buf.len() as u32,
                ) as usize
            }
        })
    }

    fn counter_value(&self, name: &str) -> Result<f64> {
        let name = to_wide(name);
        // SAFETY: name is a null-terminated UTF-16 buffer that outlives the
        // call; the export only reads it.
        Ok(unsafe { (self.get_counter_value)(name.as_ptr()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_win32_error() {
        let err = NativeLibrary::load(Path::new("definitely-not-a-counter-library-7f3a.dll")).err();
        assert!(matches!(err, Some(ConnectorError::Win32 { function: "LoadLibraryW", .. })));
    }

    #[test]
    fn library_without_exports_is_missing_symbol() {
        // kernel32 is always loaded and exports none of our entry points.
        let err = NativeLibrary::load(Path::new("kernel32.dll")).err();
        assert!(matches!(
            err,
            Some(ConnectorError::MissingSymbol { symbol: "pc_get_instance_name", .. })
        ));
    }
}

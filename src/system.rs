// ── System information ────────────────────────────────────────────────────────
//
// The connector asks three questions about its host: which OS, how wide a
// pointer is, and which process it is running in.  They sit behind a trait so
// tests can pretend to be a 64-bit Windows process from any machine.

/// Read-only view of the host the connector runs on.
pub trait SystemInfo: Send + Sync {
    /// OS identifier in `std::env::consts::OS` form (`"windows"`, `"linux"`, …).
    fn os_name(&self) -> &str;

    /// Pointer width of the running process in bits.
    fn pointer_width(&self) -> u32;

    /// Current process id, as text.  The connector parses it itself.
    fn process_id(&self) -> String;

    fn is_windows(&self) -> bool {
        self.os_name() == "windows"
    }
}

/// The real host, answered from compile-time constants and `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSystem;

impl SystemInfo for HostSystem {
    fn os_name(&self) -> &str {
        std::env::consts::OS
    }

    fn pointer_width(&self) -> u32 {
        usize::BITS
    }

    fn process_id(&self) -> String {
        std::process::id().to_string()
    }
}

// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except:
//   • `platform::win32` – LoadLibraryW / GetProcAddress and the native calls
// Each unsafe block in that module MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]

//! Best-effort bridge to the native Windows performance counter library.
//!
//! Call [`Connector::initialize`] once.  On 64-bit Windows it loads the
//! native library and resolves this process's counter instance name; on
//! anything else it logs and returns `false`, and the host runs without
//! Windows counters.
//!
//! ```no_run
//! use perfcounter_bridge::{connector, PROCESS_SELF_INSTANCE_NAME};
//!
//! if connector::initialize() {
//!     let instance = connector::translate_instance_name(PROCESS_SELF_INSTANCE_NAME)?;
//!     let name = connector::add_performance_counter("Process", "Private Bytes", Some(instance.as_str()))?;
//!     println!("{}", connector::get_value_of_performance_counter(&name)?);
//! }
//! # Ok::<(), perfcounter_bridge::ConnectorError>(())
//! ```

pub mod config;
pub mod connector;
pub mod counters;
pub mod error;
pub mod native;
pub mod platform;
pub mod system;

pub use config::ConnectorConfig;
pub use connector::{Connector, PROCESS_SELF_INSTANCE_NAME};
pub use counters::{CounterSet, CounterSpec, Sample};
pub use error::{ConnectorError, Result};
pub use native::{NativeCounters, NativeLoader, NATIVE_LIBRARY_64};
pub use system::{HostSystem, SystemInfo};

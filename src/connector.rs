// ── Native counter connector ──────────────────────────────────────────────────
//
// Front door to the native performance counter library.  `initialize` is
// best-effort: on the wrong OS, the wrong pointer width, or any load failure
// it logs one line and returns `false`, and the host carries on without
// Windows counters.  The other three calls check their arguments and forward.
//
// State is write-once.  The library handle and the resolved instance name
// are each set at most once, under `init_lock`; after that, reads are
// lock-free.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Mutex, OnceLock, PoisonError},
};

use log::{error, trace};

use crate::{
    config::ConnectorConfig,
    error::{ConnectorError, Result},
    native::{NativeCounters, NativeLoader},
    platform::SystemLoader,
    system::{HostSystem, SystemInfo},
};

/// Instance name standing for "the process this code runs in".
///
/// Process-level counters are configured with this placeholder because the
/// real instance name (`java#2`, `w3wp`, …) is only known at runtime.
pub const PROCESS_SELF_INSTANCE_NAME: &str = "__SELF__";

const NATIVE_POINTER_WIDTH: u32 = 64;

// ── Connector ─────────────────────────────────────────────────────────────────

pub struct Connector {
    config: ConnectorConfig,
    system: Box<dyn SystemInfo>,
    loader: Box<dyn NativeLoader>,
    native: OnceLock<Box<dyn NativeCounters>>,
    current_instance_name: OnceLock<String>,
    init_lock: Mutex<()>,
}

impl Connector {
    /// A connector for the real host and the platform loader.
    pub fn new(config: ConnectorConfig) -> Self {
        Self::with_collaborators(config, Box::new(HostSystem), Box::new(SystemLoader))
    }

    pub fn with_collaborators(
        config: ConnectorConfig,
        system: Box<dyn SystemInfo>,
        loader: Box<dyn NativeLoader>,
    ) -> Self {
        Self {
            config,
            system,
            loader,
            native: OnceLock::new(),
            current_instance_name: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Load the native library and resolve this process's instance name.
    ///
    /// Must be called before any other method; the others are only useful
    /// once this has returned `true`.  Never panics and never returns an
    /// error: every failure is logged and reported as `false`.
    ///
    /// An empty instance name still counts as success.  Process-level
    /// counters will be unavailable, everything else works.
    pub fn initialize(&self) -> bool {
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.native.get().is_some() {
            trace!("Native performance counter library already loaded");
            return true;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.try_initialize())) {
            Ok(Ok(())) => true,
            Ok(Err(ConnectorError::UnsupportedPlatform { os })) => {
                error!("Performance counter connector is only used on Windows OS (running on {os}).");
                false
            }
            Ok(Err(e)) => {
                error!(
                    "Failed to load native dll, Windows performance counters will not be used: '{e}'."
                );
                false
            }
            Err(_) => {
                error!(
                    "Failed to load native dll, Windows performance counters will not be used: \
                     'panic during initialization'."
                );
                false
            }
        }
    }

    fn try_initialize(&self) -> Result<()> {
        if !self.system.is_windows() {
            return Err(ConnectorError::UnsupportedPlatform {
                os: self.system.os_name().to_owned(),
            });
        }

        let bits = self.system.pointer_width();
        if bits != NATIVE_POINTER_WIDTH {
            return Err(ConnectorError::UnsupportedArchitecture { bits });
        }

        let library = self.config.library_path();
        let native = self.loader.load(&library)?;
        trace!("Successfully loaded library '{}'", library.display());

        let raw_pid = self.system.process_id();
        let process_id = raw_pid
            .trim()
            .parse::<i32>()
            .map_err(|source| ConnectorError::ProcessId { value: raw_pid.clone(), source })?;

        let name = native.instance_name(process_id)?;
        if name.is_empty() {
            error!(
                "Failed to fetch current process instance name, process counters for the \
                 process level will not be activated."
            );
        } else {
            trace!("Current process instance name is '{name}'");
            let _ = self.current_instance_name.set(name);
        }

        let _ = self.native.set(native);
        Ok(())
    }

    /// Register a counter with the native library.
    ///
    /// `category` and `counter` must be non-empty; `instance` may be absent.
    /// Returns the opaque counter name to pass to
    /// [`get_value_of_performance_counter`](Self::get_value_of_performance_counter).
    pub fn add_performance_counter(
        &self,
        category: &str,
        counter: &str,
        instance: Option<&str>,
    ) -> Result<String> {
        require_non_empty(category, "category")?;
        require_non_empty(counter, "counter")?;

        self.native()?.add_counter(category, counter, instance)
    }

    /// Replace [`PROCESS_SELF_INSTANCE_NAME`] with the instance name resolved
    /// by `initialize`.  Any other name comes back unchanged.
    ///
    /// Fails with `UnresolvedSelfInstance` if the placeholder is asked for but
    /// no name was resolved, which means `initialize` was not called, failed,
    /// or could not resolve one.
    pub fn translate_instance_name(&self, instance_name: &str) -> Result<String> {
        if instance_name != PROCESS_SELF_INSTANCE_NAME {
            return Ok(instance_name.to_owned());
        }

        self.instance_name()
            .map(str::to_owned)
            .ok_or(ConnectorError::UnresolvedSelfInstance)
    }

    /// Read the current value of a counter registered with
    /// [`add_performance_counter`](Self::add_performance_counter).
    pub fn get_value_of_performance_counter(&self, name: &str) -> Result<f64> {
        require_non_empty(name, "name")?;

        self.native()?.counter_value(name)
    }

    /// The resolved instance name of this process, once known.
    pub fn instance_name(&self) -> Option<&str> {
        self.current_instance_name
            .get()
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn is_initialized(&self) -> bool {
        self.native.get().is_some()
    }

    fn native(&self) -> Result<&dyn NativeCounters> {
        self.native
            .get()
            .map(|native| native.as_ref())
            .ok_or(ConnectorError::NotInitialized)
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("library", &self.config.library_path())
            .field("initialized", &self.is_initialized())
            .field("instance_name", &self.instance_name())
            .finish()
    }
}

fn require_non_empty(value: &str, argument: &'static str) -> Result<()> {
    if value.is_empty() {
        return Err(ConnectorError::InvalidArgument { argument });
    }
    Ok(())
}

// ── Process-wide connector ────────────────────────────────────────────────────
//
// The native library is process-global, so most hosts want exactly one
// connector.  These free functions mirror the methods on that instance.

static GLOBAL: OnceLock<Connector> = OnceLock::new();

/// Create the process-wide connector from `config`.
///
/// Returns the config back if the connector already exists (installed
/// earlier, or created with defaults by a call to [`global`]).
pub fn install(config: ConnectorConfig) -> std::result::Result<&'static Connector, ConnectorConfig> {
    let mut pending = Some(config);
    let connector = GLOBAL.get_or_init(|| Connector::new(pending.take().unwrap_or_default()));
    match pending {
        None => Ok(connector),
        Some(config) => Err(config),
    }
}

/// The process-wide connector, created with default configuration on first
/// use unless [`install`] ran before.
pub fn global() -> &'static Connector {
    GLOBAL.get_or_init(|| Connector::new(ConnectorConfig::default()))
}

pub fn initialize() -> bool {
    global().initialize()
}

pub fn add_performance_counter(category: &str, counter: &str, instance: Option<&str>) -> Result<String> {
    global().add_performance_counter(category, counter, instance)
}

pub fn translate_instance_name(instance_name: &str) -> Result<String> {
    global().translate_instance_name(instance_name)
}

pub fn get_value_of_performance_counter(name: &str) -> Result<f64> {
    global().get_value_of_performance_counter(name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

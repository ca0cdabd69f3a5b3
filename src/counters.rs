// ── Counter registration and sampling ─────────────────────────────────────────
//
// A `CounterSet` is what a collector holds on to: the counters it asked for,
// each paired with the opaque name the native library handed back.  Failures
// are per counter.  One unknown category does not take the others down.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::connector::{Connector, PROCESS_SELF_INSTANCE_NAME};

// ── CounterSpec ───────────────────────────────────────────────────────────────

/// A counter to register: `\category(instance)\counter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSpec {
    pub category: String,
    pub counter: String,
    /// `None` for single-instance categories such as `Memory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl CounterSpec {
    pub fn new(category: &str, counter: &str, instance: Option<&str>) -> Self {
        Self {
            category: category.to_owned(),
            counter: counter.to_owned(),
            instance: instance.map(str::to_owned),
        }
    }

    /// Process CPU, process private bytes and available memory.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("Process", "% Processor Time", Some(PROCESS_SELF_INSTANCE_NAME)),
            Self::new("Process", "Private Bytes", Some(PROCESS_SELF_INSTANCE_NAME)),
            Self::new("Memory", "Available Bytes", None),
        ]
    }

    /// Windows counter path, e.g. `\Process(__SELF__)\Private Bytes`.
    pub fn path(&self) -> String {
        match &self.instance {
            Some(instance) if !instance.is_empty() => {
                format!("\\{}({})\\{}", self.category, instance, self.counter)
            }
            _ => format!("\\{}\\{}", self.category, self.counter),
        }
    }
}

// ── CounterSet ────────────────────────────────────────────────────────────────

/// A counter accepted by the native library.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredCounter {
    pub spec: CounterSpec,
    /// Instance after `__SELF__` translation.
    pub instance: Option<String>,
    /// Opaque name returned by the native registration call.
    pub native_name: String,
}

/// One reading of one counter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Counter path as configured (before `__SELF__` translation).
    pub path: String,
    pub value: f64,
}

#[derive(Debug, Default)]
pub struct CounterSet {
    counters: Vec<RegisteredCounter>,
}

impl CounterSet {
    /// Register every spec through `connector`, skipping the ones that fail.
    ///
    /// `__SELF__` instances are translated first; when the process instance
    /// name is unknown those counters are left out and the rest still load.
    pub fn register(connector: &Connector, specs: &[CounterSpec]) -> Self {
        let mut counters = Vec::with_capacity(specs.len());

        for spec in specs {
            let instance = match spec.instance.as_deref().map(|i| connector.translate_instance_name(i)) {
                None => None,
                Some(Ok(instance)) => Some(instance),
                Some(Err(e)) => {
                    warn!("Skipping performance counter '{}': {e}", spec.path());
                    continue;
                }
            };

            match connector.add_performance_counter(&spec.category, &spec.counter, instance.as_deref()) {
                Ok(native_name) if native_name.is_empty() => {
                    warn!("Native library rejected performance counter '{}'", spec.path());
                }
                Ok(native_name) => {
                    debug!("Registered performance counter '{}' as '{native_name}'", spec.path());
                    counters.push(RegisteredCounter { spec: spec.clone(), instance, native_name });
                }
                Err(e) => warn!("Failed to register performance counter '{}': {e}", spec.path()),
            }
        }

        Self { counters }
    }

    pub fn counters(&self) -> &[RegisteredCounter] {
        &self.counters
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Read every registered counter once.  Failed reads are logged and left
    /// out of the result.
    pub fn sample(&self, connector: &Connector) -> Vec<Sample> {
        self.counters
            .iter()
            .filter_map(|c| match connector.get_value_of_performance_counter(&c.native_name) {
                Ok(value) => Some(Sample { path: c.spec.path(), value }),
                Err(e) => {
                    warn!("Failed to read performance counter '{}': {e}", c.spec.path());
                    None
                }
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::connector::testing::{Harness, NativeCall};

    #[test]
    fn path_with_and_without_instance() {
        assert_eq!(
            CounterSpec::new("Process", "Private Bytes", Some("__SELF__")).path(),
            r"\Process(__SELF__)\Private Bytes"
        );
        assert_eq!(CounterSpec::new("Memory", "Available Bytes", None).path(), r"\Memory\Available Bytes");
        assert_eq!(CounterSpec::new("Memory", "Available Bytes", Some("")).path(), r"\Memory\Available Bytes");
    }

    #[test]
    fn instance_is_omitted_from_json_when_absent() {
        let json = serde_json::to_string(&CounterSpec::new("Memory", "Available Bytes", None)).unwrap();
        assert_eq!(json, r#"{"category":"Memory","counter":"Available Bytes"}"#);
    }

    #[test]
    fn register_translates_self_instance() {
        let h = Harness::windows("java#2");
        assert!(h.connector.initialize());

        let set = CounterSet::register(&h.connector, &CounterSpec::defaults());

        assert_eq!(set.len(), 3);
        assert_eq!(set.counters()[0].instance.as_deref(), Some("java#2"));
        assert_eq!(set.counters()[0].native_name, "Process/% Processor Time/java#2");
        assert_eq!(set.counters()[2].instance, None);
        assert_eq!(
            h.calls()[1],
            NativeCall::AddCounter("Process".to_owned(), "% Processor Time".to_owned(), Some("java#2".to_owned()))
        );
    }

    #[test]
    fn unresolved_self_instance_skips_process_counters() {
        let h = Harness::windows("");
        assert!(h.connector.initialize());

        let set = CounterSet::register(&h.connector, &CounterSpec::defaults());

        assert_eq!(set.len(), 1);
        assert_eq!(set.counters()[0].spec, CounterSpec::new("Memory", "Available Bytes", None));
    }

    #[test]
    fn invalid_specs_are_skipped() {
        let h = Harness::windows("java#2");
        assert!(h.connector.initialize());

        let specs = vec![
            CounterSpec::new("", "Private Bytes", None),
            CounterSpec::new("Memory", "Available Bytes", None),
        ];
        let set = CounterSet::register(&h.connector, &specs);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn nothing_registers_before_initialize() {
        let h = Harness::windows("java#2");
        let set = CounterSet::register(&h.connector, &CounterSpec::defaults());
        assert!(set.is_empty());
        assert!(set.sample(&h.connector).is_empty());
    }

    #[test]
    fn sample_reads_every_counter() {
        let h = Harness::windows("java#2");
        assert!(h.connector.initialize());
        let set = CounterSet::register(&h.connector, &CounterSpec::defaults());

        let samples = set.sample(&h.connector);

        assert_eq!(
            samples,
            vec![
                Sample { path: r"\Process(__SELF__)\% Processor Time".to_owned(), value: 42.5 },
                Sample { path: r"\Process(__SELF__)\Private Bytes".to_owned(), value: 42.5 },
                Sample { path: r"\Memory\Available Bytes".to_owned(), value: 42.5 },
            ]
        );
        assert_eq!(
            h.calls().last(),
            Some(&NativeCall::CounterValue("Memory/Available Bytes/".to_owned()))
        );
    }
}

// ── Connector configuration ───────────────────────────────────────────────────
//
// Reads a small JSON document describing where the native library lives and
// which counters `pcprobe` should register.  No `unsafe` — pure safe Rust +
// serde_json.

use std::{
    env::consts::{DLL_PREFIX, DLL_SUFFIX},
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    counters::CounterSpec,
    error::{ConnectorError, Result},
    native::NATIVE_LIBRARY_64,
};

// ── Format version ────────────────────────────────────────────────────────────

pub const CONFIG_VERSION: u32 = 1;

// ── On-disk type ──────────────────────────────────────────────────────────────

/// Root of the JSON configuration file.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub version: u32,
    /// Library base name, without platform prefix or suffix.
    pub library_name: String,
    /// Directory holding the library.  `None` uses the loader's search order.
    pub library_dir: Option<PathBuf>,
    /// Counters to register.  Empty means `CounterSpec::defaults()`.
    pub counters: Vec<CounterSpec>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            library_name: NATIVE_LIBRARY_64.to_owned(),
            library_dir: None,
            counters: Vec::new(),
        }
    }
}

impl ConnectorConfig {
    /// Read and parse a configuration file.
    ///
    /// Unlike session-style state, a broken configuration is an error the
    /// operator needs to see, so nothing here falls back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_slice(&data)
    }

    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)?;
        if config.version != CONFIG_VERSION {
            return Err(ConnectorError::ConfigVersion {
                found: config.version,
                expected: CONFIG_VERSION,
            });
        }
        Ok(config)
    }

    /// Platform file name of the library, e.g. `name.dll` on Windows.
    pub fn library_file_name(&self) -> String {
        format!("{DLL_PREFIX}{}{DLL_SUFFIX}", self.library_name)
    }

    /// What gets handed to the loader: the file name, joined to
    /// `library_dir` when one is configured.
    pub fn library_path(&self) -> PathBuf {
        match &self.library_dir {
            Some(dir) => dir.join(self.library_file_name()),
            None => PathBuf::from(self.library_file_name()),
        }
    }

    /// The counters to register, falling back to the built-in set.
    pub fn effective_counters(&self) -> Vec<CounterSpec> {
        if self.counters.is_empty() {
            CounterSpec::defaults()
        } else {
            self.counters.clone()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_document_takes_defaults() {
        let config = ConnectorConfig::from_slice(b"{}").expect("parse");
        assert_eq!(config, ConnectorConfig::default());
        assert_eq!(config.library_name, "applicationinsights-core-native-win64");
    }

    #[test]
    fn library_path_joins_directory() {
        let config = ConnectorConfig {
            library_dir: Some(PathBuf::from("native")),
            ..ConnectorConfig::default()
        };
        let expected = Path::new("native").join(config.library_file_name());
        assert_eq!(config.library_path(), expected);
    }

    #[test]
    fn library_file_name_uses_platform_affixes() {
        let config = ConnectorConfig {
            library_name: "counters".to_owned(),
            ..ConnectorConfig::default()
        };
        assert_eq!(config.library_file_name(), format!("{DLL_PREFIX}counters{DLL_SUFFIX}"));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let err = ConnectorConfig::from_slice(br#"{"version":7}"#).unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigVersion { found: 7, expected: 1 }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = ConnectorConfig::from_slice(b"{ not json").unwrap_err();
        assert!(matches!(err, ConnectorError::Json(_)));
    }

    #[test]
    fn load_reads_counters_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{
                "version": 1,
                "library_dir": "C:\\agent\\native",
                "counters": [
                    {{"category": "Process", "counter": "Handle Count", "instance": "__SELF__"}},
                    {{"category": "Memory", "counter": "Committed Bytes"}}
                ]
            }}"#
        )
        .expect("write");

        let config = ConnectorConfig::load(file.path()).expect("load");
        assert_eq!(config.library_dir, Some(PathBuf::from("C:\\agent\\native")));
        assert_eq!(
            config.effective_counters(),
            vec![
                CounterSpec::new("Process", "Handle Count", Some("__SELF__")),
                CounterSpec::new("Memory", "Committed Bytes", None),
            ]
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = ConnectorConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConnectorError::Io(_)));
    }

    #[test]
    fn no_counters_means_defaults() {
        assert_eq!(ConnectorConfig::default().effective_counters(), CounterSpec::defaults());
    }
}

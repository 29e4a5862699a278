//! CLI configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional file
//! (`--config`, any format the `config` crate reads), then `FERRITE_*`
//! environment variables (`FERRITE_LOGGING__LEVEL=debug`,
//! `FERRITE_DEFINITIONS=a.json,b.json`). Command-line flags are applied last.

use anyhow::Context;
use ferrite_models::FhirVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fhir_version: FhirVersion,
    /// Persisted schema cache, preferred over `definitions` when it exists
    pub schema_cache: Option<PathBuf>,
    /// Conformance bundles parsed when no schema cache is available
    pub definitions: Vec<PathBuf>,
    /// YAML validator configuration
    pub validator_config: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fhir_version: FhirVersion::R4,
            schema_cache: None,
            definitions: Vec::new(),
            validator_config: None,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for the ferrite crates; `RUST_LOG` wins when set
    pub level: String,
    /// JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load defaults, `file` and the process environment.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(file, environment())
    }

    pub(crate) fn load_with_env(
        file: Option<&Path>,
        env: config::Environment,
    ) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }

        let config: AppConfig = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(config)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("FERRITE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("definitions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn defaults_without_sources() {
        let config = AppConfig::load_with_env(None, env(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferrite.yaml");
        std::fs::write(
            &path,
            "fhir_version: R5\nschema_cache: /tmp/schema.json\nlogging:\n  level: info\n  json: true\n",
        )
        .unwrap();

        let config = AppConfig::load_with_env(
            Some(&path),
            env(&[
                ("FERRITE_LOGGING__LEVEL", "debug"),
                ("FERRITE_DEFINITIONS", "a.json,b.json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.fhir_version, FhirVersion::R5);
        assert_eq!(config.schema_cache, Some(PathBuf::from("/tmp/schema.json")));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(
            config.definitions,
            vec![PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
    }
}

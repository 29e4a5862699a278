//! Validator configuration
//!
//! A [`ValidatorConfig`] is plain data: build it from a [`Preset`], the
//! [`ValidatorConfigBuilder`] or YAML, then [`ValidatorConfig::compile`] it
//! into a [`ValidationPlan`].
//!
//! ```yaml
//! preset: Authoring
//! fhir:
//!   version: R4
//! schema:
//!   unknown_properties: Error
//! exec:
//!   fail_fast: false
//!   max_messages: 500
//! ```

use crate::plan::{ReferencesPlan, StructurePlan, TerminologyPlan, ValidationPlan};
use crate::ConfigError;
use ferrite_models::FhirVersion;
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    /// Accept as much as possible: warnings for unknown properties, no
    /// terminology or reference checks
    Ingestion,
    /// The default checks
    Server,
    /// Everything on, unknown properties as warnings, generous message limit
    Authoring,
    /// Everything on and strict
    Publication,
}

/// How properties the schema does not know are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownPropertyMode {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminologyMode {
    Off,
    /// Check codes against the value sets loaded into the schema
    Local,
}

/// Severity of a code missing from an extensible or preferred binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtensibleHandling {
    Warn,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceMode {
    Off,
    /// Check the referenced resource type against the allowed targets
    TypeOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FhirConfig {
    pub version: FhirVersion,
}

impl Default for FhirConfig {
    fn default() -> Self {
        Self {
            version: FhirVersion::R4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub unknown_properties: UnknownPropertyMode,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            unknown_properties: UnknownPropertyMode::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminologyConfig {
    pub mode: TerminologyMode,
    pub extensible_handling: ExtensibleHandling,
}

impl Default for TerminologyConfig {
    fn default() -> Self {
        Self {
            mode: TerminologyMode::Local,
            extensible_handling: ExtensibleHandling::Warn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferencesConfig {
    pub mode: ReferenceMode,
    pub allow_unknown_target: bool,
}

impl Default for ReferencesConfig {
    fn default() -> Self {
        Self {
            mode: ReferenceMode::TypeOnly,
            allow_unknown_target: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub fail_fast: bool,
    pub max_messages: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            max_messages: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,
    pub fhir: FhirConfig,
    pub schema: SchemaConfig,
    pub terminology: TerminologyConfig,
    pub references: ReferencesConfig,
    pub exec: ExecConfig,
}

impl ValidatorConfig {
    pub fn preset(preset: Preset) -> Self {
        let mut cfg = Self {
            preset: Some(preset),
            ..Self::default()
        };
        match preset {
            Preset::Ingestion => {
                cfg.schema.unknown_properties = UnknownPropertyMode::Warning;
                cfg.terminology.mode = TerminologyMode::Off;
                cfg.references.mode = ReferenceMode::Off;
                cfg.exec.max_messages = 100;
            }
            Preset::Server => {}
            Preset::Authoring => {
                cfg.schema.unknown_properties = UnknownPropertyMode::Warning;
                cfg.exec.max_messages = 10_000;
            }
            Preset::Publication => {
                cfg.references.allow_unknown_target = false;
                cfg.exec.max_messages = 10_000;
            }
        }
        cfg
    }

    pub fn builder() -> ValidatorConfigBuilder {
        ValidatorConfigBuilder::default()
    }

    /// Parse YAML. A `preset` key supplies the defaults the other keys
    /// override.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut overrides: YamlValue = serde_yaml::from_str(yaml)?;
        if overrides.is_null() {
            return Ok(Self::default());
        }
        let preset = overrides
            .get("preset")
            .cloned()
            .map(serde_yaml::from_value::<Preset>)
            .transpose()?;

        let mut merged = match preset {
            Some(preset) => serde_yaml::to_value(Self::preset(preset))?,
            None => serde_yaml::to_value(Self::default())?,
        };
        merge_yaml(&mut merged, std::mem::take(&mut overrides));
        Ok(serde_yaml::from_value(merged)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn compile(&self) -> Result<ValidationPlan, ConfigError> {
        if self.exec.max_messages == 0 {
            return Err(ConfigError::InvalidConfig(
                "exec.max_messages must be at least 1".to_string(),
            ));
        }
        Ok(ValidationPlan {
            fhir_version: self.fhir.version,
            structure: StructurePlan::from(&self.schema),
            terminology: TerminologyPlan::from_config(&self.terminology),
            references: ReferencesPlan::from_config(&self.references),
            fail_fast: self.exec.fail_fast,
            max_messages: self.exec.max_messages,
        })
    }
}

/// Overlay `overrides` onto `base`, recursing into mappings.
fn merge_yaml(base: &mut YamlValue, overrides: YamlValue) {
    match (base, overrides) {
        (YamlValue::Mapping(base), YamlValue::Mapping(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidatorConfigBuilder {
    config: ValidatorConfig,
}

impl ValidatorConfigBuilder {
    pub fn preset(mut self, preset: Preset) -> Self {
        self.config = ValidatorConfig::preset(preset);
        self
    }

    pub fn fhir_version(mut self, version: FhirVersion) -> Self {
        self.config.fhir.version = version;
        self
    }

    pub fn unknown_properties(mut self, mode: UnknownPropertyMode) -> Self {
        self.config.schema.unknown_properties = mode;
        self
    }

    pub fn terminology_mode(mut self, mode: TerminologyMode) -> Self {
        self.config.terminology.mode = mode;
        self
    }

    pub fn extensible_handling(mut self, handling: ExtensibleHandling) -> Self {
        self.config.terminology.extensible_handling = handling;
        self
    }

    pub fn reference_mode(mut self, mode: ReferenceMode) -> Self {
        self.config.references.mode = mode;
        self
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.exec.fail_fast = fail_fast;
        self
    }

    pub fn max_messages(mut self, max: usize) -> Self {
        self.config.exec.max_messages = max;
        self
    }

    pub fn build(self) -> ValidatorConfig {
        self.config
    }
}

use crate::{
    ExtensibleHandling, ReferenceMode, ReferencesConfig, SchemaConfig, TerminologyConfig,
    TerminologyMode, UnknownPropertyMode,
};
use ferrite_models::FhirVersion;

/// Compiled validation plan: which checks a session runs and how it reports
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPlan {
    pub fhir_version: FhirVersion,
    pub structure: StructurePlan,
    /// `None` skips value-set binding checks
    pub terminology: Option<TerminologyPlan>,
    /// `None` skips reference target checks
    pub references: Option<ReferencesPlan>,
    pub fail_fast: bool,
    pub max_messages: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructurePlan {
    pub unknown_properties: UnknownPropertyMode,
}

impl From<&SchemaConfig> for StructurePlan {
    fn from(cfg: &SchemaConfig) -> Self {
        Self {
            unknown_properties: cfg.unknown_properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerminologyPlan {
    pub extensible_handling: ExtensibleHandling,
}

impl TerminologyPlan {
    pub fn from_config(cfg: &TerminologyConfig) -> Option<Self> {
        match cfg.mode {
            TerminologyMode::Off => None,
            TerminologyMode::Local => Some(Self {
                extensible_handling: cfg.extensible_handling,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferencesPlan {
    /// Accept references whose target type cannot be derived (`#id`, `urn:uuid:`)
    pub allow_unknown_target: bool,
}

impl ReferencesPlan {
    pub fn from_config(cfg: &ReferencesConfig) -> Option<Self> {
        match cfg.mode {
            ReferenceMode::Off => None,
            ReferenceMode::TypeOnly => Some(Self {
                allow_unknown_target: cfg.allow_unknown_target,
            }),
        }
    }
}

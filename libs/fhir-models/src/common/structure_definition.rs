//! FHIR StructureDefinition model
//!
//! Version-agnostic model for StructureDefinitions (profiles, resources and
//! data types).

use super::element_definition::{Differential, ElementDefinition, Snapshot};
use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical URL prefix shared by all core definitions
pub const CORE_DEFINITION_PREFIX: &str = "http://hl7.org/fhir/StructureDefinition/";

/// FHIR StructureDefinition resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructureDefinition {
    /// Resource type - always "StructureDefinition"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Logical id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Canonical identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Business version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Name (computer friendly)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// primitive-type | complex-type | resource | logical
    pub kind: StructureDefinitionKind,

    /// Whether the structure is abstract
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,

    /// Type defined or constrained by this structure
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Definition that this type is constrained/specialized from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_definition: Option<String>,

    /// specialization | constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation: Option<TypeDerivationRule>,

    /// FHIR version this structure is written against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fhir_version: Option<String>,

    /// Snapshot view of the structure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,

    /// Differential view of the structure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differential: Option<Differential>,

    /// Additional content (text, contact, mapping, extension, ...)
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

fn default_resource_type() -> String {
    "StructureDefinition".to_string()
}

/// Kind of structure a StructureDefinition describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructureDefinitionKind {
    PrimitiveType,
    ComplexType,
    Resource,
    Logical,
}

impl StructureDefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimitiveType => "primitive-type",
            Self::ComplexType => "complex-type",
            Self::Resource => "resource",
            Self::Logical => "logical",
        }
    }
}

/// How a structure relates to its base definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDerivationRule {
    Specialization,
    Constraint,
}

impl StructureDefinition {
    /// Minimal definition with an id, a kind and a type
    pub fn new(id: impl Into<String>, kind: StructureDefinitionKind, type_: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            resource_type: default_resource_type(),
            url: Some(format!("{}{}", CORE_DEFINITION_PREFIX, id)),
            name: Some(id.clone()),
            id: Some(id),
            version: None,
            kind,
            is_abstract: false,
            type_: Some(type_.into()),
            base_definition: None,
            derivation: None,
            fhir_version: None,
            snapshot: None,
            differential: None,
            extensions: Map::new(),
        }
    }

    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// Convert to JSON Value
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::from)
    }

    /// Identity used as a schema key: `id`, falling back to `url`.
    pub fn identity(&self) -> Option<&str> {
        self.id.as_deref().or(self.url.as_deref())
    }

    /// Whether this is a core definition (canonical under the HL7 prefix)
    pub fn is_core(&self) -> bool {
        self.url
            .as_deref()
            .is_some_and(|url| url.starts_with(CORE_DEFINITION_PREFIX))
    }

    /// Snapshot elements (empty when there is no snapshot)
    pub fn snapshot_elements(&self) -> &[ElementDefinition] {
        self.snapshot
            .as_ref()
            .map(|s| s.element.as_slice())
            .unwrap_or(&[])
    }

    /// Differential elements (empty when there is no differential)
    pub fn differential_elements(&self) -> &[ElementDefinition] {
        self.differential
            .as_ref()
            .map(|d| d.element.as_slice())
            .unwrap_or(&[])
    }

    /// Root element of the snapshot
    pub fn root_element(&self) -> Option<&ElementDefinition> {
        self.snapshot_elements().first()
    }
}

//! The parsed schema: type definitions and resolved value sets

use crate::property::{Property, PropertyType};
use ferrite_models::{FhirVersion, StructureDefinitionKind, CORE_DEFINITION_PREFIX};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root property list of a resource or data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    /// FHIR type name (`Patient`, `HumanName`)
    pub name: String,
    pub kind: StructureDefinitionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub properties: Vec<Property>,
}

impl TypeDefinition {
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Codes of one system inside a value set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CodeSystemCodes {
    pub system: String,
    pub codes: Vec<Concept>,
}

/// A value set flattened into per-system code lists
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueSetCodes {
    pub url: String,
    pub systems: Vec<CodeSystemCodes>,
}

impl ValueSetCodes {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            systems: Vec::new(),
        }
    }

    /// Total number of codes across all systems
    pub fn code_count(&self) -> usize {
        self.systems.iter().map(|s| s.codes.len()).sum()
    }

    /// Append codes under `system`, skipping codes already listed there.
    pub fn add_codes(&mut self, system: &str, codes: impl IntoIterator<Item = Concept>) {
        let index = match self.systems.iter().position(|s| s.system == system) {
            Some(index) => index,
            None => {
                self.systems.push(CodeSystemCodes {
                    system: system.to_string(),
                    codes: Vec::new(),
                });
                self.systems.len() - 1
            }
        };
        let entry = &mut self.systems[index];
        for concept in codes {
            if !entry.codes.iter().any(|c| c.code == concept.code) {
                entry.codes.push(concept);
            }
        }
    }

    /// Whether `code` is listed; with `system = None` any system matches.
    pub fn contains(&self, system: Option<&str>, code: &str) -> bool {
        self.systems
            .iter()
            .filter(|s| system.map_or(true, |sys| s.system == sys))
            .any(|s| s.codes.iter().any(|c| c.code == code))
    }
}

/// Parsed conformance model for one FHIR version.
///
/// Immutable once loaded and shared as `Arc<Schema>`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub version: FhirVersion,
    pub types: HashMap<String, TypeDefinition>,
    pub value_sets: HashMap<String, ValueSetCodes>,
}

impl Schema {
    pub fn new(version: FhirVersion) -> Self {
        Self {
            version,
            types: HashMap::new(),
            value_sets: HashMap::new(),
        }
    }

    /// Type definition by key, falling back to the core definition named `name`.
    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        if let Some(def) = self.types.get(name) {
            return Some(def);
        }
        let core_url = format!("{}{}", CORE_DEFINITION_PREFIX, name);
        self.types
            .values()
            .find(|def| def.name == name && def.url.as_deref() == Some(core_url.as_str()))
    }

    /// Resource type definition by name (`Patient`)
    pub fn get_resource(&self, name: &str) -> Option<&TypeDefinition> {
        self.get_type(name)
            .filter(|def| def.kind == StructureDefinitionKind::Resource)
    }

    pub fn insert_type(&mut self, key: impl Into<String>, def: TypeDefinition) {
        self.types.insert(key.into(), def);
    }

    pub fn value_set(&self, url: &str) -> Option<&ValueSetCodes> {
        let url = url.split('|').next().unwrap_or(url);
        self.value_sets.get(url)
    }

    /// Code membership: `None` when the value set is not loaded.
    pub fn contains_code(&self, url: &str, system: Option<&str>, code: &str) -> Option<bool> {
        self.value_set(url).map(|vs| vs.contains(system, code))
    }

    /// Resolve `#TypeName.path.to.node` to the node it names.
    pub fn resolve_local_reference(&self, reference: &str) -> Option<&Property> {
        let path = reference.trim_start_matches('#');
        let mut segments = path.split('.');
        let type_name = segments.next()?;
        let def = self.get_type(type_name)?;

        let mut properties: &[Property] = &def.properties;
        let mut found: Option<&Property> = None;
        for segment in segments {
            let prop = properties.iter().find(|p| p.name == segment)?;
            properties = prop.children().unwrap_or(&[]);
            found = Some(prop);
        }
        found.filter(|p| matches!(p.ty, PropertyType::Backbone { .. }))
    }
}

//! FHIR Bundle model
//!
//! Only the parts a conformance package needs: typed entries holding raw
//! resources that are dispatched on their `resourceType`.

use super::code_system::CodeSystem;
use super::error::{Error, Result};
use super::structure_definition::StructureDefinition;
use super::value_set::ValueSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// FHIR Bundle resource
///
/// A container for a collection of resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Resource type - always "Bundle"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Logical id of this artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Indicates the purpose of this bundle - how it was intended to be used
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<BundleType>,

    /// Entry in the bundle - will have a resource or information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Vec<BundleEntry>>,

    /// Additional content beyond core fields
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

fn default_resource_type() -> String {
    "Bundle".to_string()
}

/// Type of Bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Document,
    Message,
    Transaction,
    TransactionResponse,
    Batch,
    BatchResponse,
    History,
    Searchset,
    Collection,
    SubscriptionNotification,
}

/// Entry in the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    /// Full URL for the entry (relative to the base URL, or absolute)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    /// A resource in this bundle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    /// Additional content beyond core fields (request, response, search)
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl BundleEntry {
    /// `resourceType` of the contained resource
    pub fn resource_type(&self) -> Option<&str> {
        self.resource.as_ref()?.get("resourceType")?.as_str()
    }
}

impl Bundle {
    /// Create an empty collection bundle
    pub fn collection() -> Self {
        Self {
            resource_type: default_resource_type(),
            bundle_type: Some(BundleType::Collection),
            ..Default::default()
        }
    }

    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        let bundle: Bundle = serde_json::from_value(value.clone()).map_err(Error::from)?;
        if bundle.resource_type != "Bundle" {
            return Err(Error::UnexpectedResourceType(format!(
                "expected a Bundle, found '{}'",
                bundle.resource_type
            )));
        }
        Ok(bundle)
    }

    /// Get entries as a slice
    pub fn entries(&self) -> &[BundleEntry] {
        self.entry.as_deref().unwrap_or(&[])
    }

    /// Add a resource as a new entry
    pub fn add_resource(&mut self, resource: Value) {
        self.entry.get_or_insert_with(Vec::new).push(BundleEntry {
            resource: Some(resource),
            ..Default::default()
        });
    }

    /// Raw resources of the given `resourceType`, in entry order
    pub fn resources_of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.entries()
            .iter()
            .filter(move |entry| entry.resource_type() == Some(resource_type))
            .filter_map(|entry| entry.resource.as_ref())
    }

    /// Typed StructureDefinitions of this bundle
    pub fn structure_definitions(&self) -> Result<Vec<StructureDefinition>> {
        self.resources_of_type("StructureDefinition")
            .map(|value| serde_json::from_value(value.clone()).map_err(Error::from))
            .collect()
    }

    /// Typed ValueSets of this bundle
    pub fn value_sets(&self) -> Result<Vec<ValueSet>> {
        self.resources_of_type("ValueSet")
            .map(|value| serde_json::from_value(value.clone()).map_err(Error::from))
            .collect()
    }

    /// Typed CodeSystems of this bundle
    pub fn code_systems(&self) -> Result<Vec<CodeSystem>> {
        self.resources_of_type("CodeSystem")
            .map(|value| serde_json::from_value(value.clone()).map_err(Error::from))
            .collect()
    }
}

//! FHIR ValueSet model
//!
//! Version-agnostic model for ValueSets (terminology)

use super::complex::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// FHIR ValueSet resource
///
/// A set of codes drawn from one or more code systems.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValueSet {
    /// Resource type - always "ValueSet"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Logical id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Canonical identifier
    #[serde(default)]
    pub url: String,

    /// Business version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Name (computer friendly)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Publication status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PublicationStatus>,

    /// Content logical definition (the "intension")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose: Option<ValueSetCompose>,

    /// Used when the value set is "expanded"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion: Option<ValueSetExpansion>,

    /// Additional content
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

fn default_resource_type() -> String {
    "ValueSet".to_string()
}

/// Content logical definition of the value set (intension)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetCompose {
    /// Whether inactive codes are in the value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive: Option<bool>,

    /// Include one or more codes from a code system or other value set
    #[serde(default)]
    pub include: Vec<ValueSetInclude>,

    /// Explicitly exclude codes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<ValueSetInclude>>,
}

/// Include (or exclude) codes from a code system or other value sets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetInclude {
    /// The system the codes come from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Specific version of the code system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Specific codes from the system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<Vec<ValueSetConcept>>,

    /// Select codes/concepts by their properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<ValueSetFilter>>,

    /// Select only contents included in specified value set(s)
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub value_set: Option<Vec<String>>,
}

/// A concept listed explicitly in a compose include/exclude
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueSetConcept {
    /// Code from the system
    pub code: String,

    /// Text to display for this code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Select codes by property
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueSetFilter {
    /// Property name
    pub property: String,

    /// Filter operator (= | is-a | descendent-of | is-not-a | regex | in | not-in | generalizes | exists)
    pub op: String,

    /// Value of the filter
    pub value: String,
}

/// Expansion of the value set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetExpansion {
    /// Uniquely identifies this expansion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Time valueset expansion was generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Total number of codes in the expansion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,

    /// Codes in the value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<Vec<ValueSetExpansionContains>>,
}

/// Codes in an expansion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetExpansionContains {
    /// System value for the code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// If user cannot select this entry
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub is_abstract: Option<bool>,

    /// If concept is inactive in the code system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive: Option<bool>,

    /// Code - if blank, this is not a selectable code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// User display for the concept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    /// Codes contained under this entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<Vec<ValueSetExpansionContains>>,
}

impl ValueSetExpansionContains {
    /// Whether this entry can be selected as a value
    pub fn is_selectable(&self) -> bool {
        self.code.is_some() && !self.inactive.unwrap_or(false) && !self.is_abstract.unwrap_or(false)
    }
}

impl ValueSetExpansion {
    /// All expansion entries, nested `contains` flattened depth-first
    pub fn flatten(&self) -> Vec<&ValueSetExpansionContains> {
        fn walk<'a>(
            entries: &'a [ValueSetExpansionContains],
            out: &mut Vec<&'a ValueSetExpansionContains>,
        ) {
            for entry in entries {
                out.push(entry);
                if let Some(children) = &entry.contains {
                    walk(children, out);
                }
            }
        }

        let mut out = Vec::new();
        if let Some(contains) = &self.contains {
            walk(contains, &mut out);
        }
        out
    }
}

impl ValueSet {
    /// Create a new ValueSet with minimal required fields
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            resource_type: default_resource_type(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Canonical URL, falling back to the logical id
    pub fn identity(&self) -> Option<&str> {
        if !self.url.is_empty() {
            Some(&self.url)
        } else {
            self.id.as_deref()
        }
    }

    /// Value set URLs this one imports through `compose.include.valueSet`
    pub fn imported_value_sets(&self) -> Vec<&str> {
        self.compose
            .iter()
            .flat_map(|compose| compose.include.iter())
            .flat_map(|include| include.value_set.iter().flatten())
            .map(|url| url.split('|').next().unwrap_or(url))
            .collect()
    }
}

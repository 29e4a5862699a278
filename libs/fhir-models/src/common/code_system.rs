//! FHIR CodeSystem model
//!
//! Version-agnostic model for CodeSystems (terminology)

use super::complex::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// FHIR CodeSystem resource
///
/// Declares the existence of and describes a code system or code system supplement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CodeSystem {
    /// Resource type - always "CodeSystem"
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

    /// If code comparison is case sensitive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,

    /// Canonical reference to the value set with all codes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,

    /// Content type (not-present | example | fragment | complete | supplement)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<CodeSystemContentMode>,

    /// Concepts in the code system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<Vec<CodeSystemConcept>>,

    /// Additional content
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

fn default_resource_type() -> String {
    "CodeSystem".to_string()
}

/// How much of the content of the code system is represented
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodeSystemContentMode {
    NotPresent,
    Example,
    Fragment,
    Complete,
    Supplement,
}

/// Concept in a code system, possibly with nested child concepts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeSystemConcept {
    /// Code that identifies concept
    pub code: String,

    /// Text to display to the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    /// Formal definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,

    /// Child concepts (is-a/contains/categorizes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<Vec<CodeSystemConcept>>,
}

impl CodeSystem {
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

    /// Every concept of the hierarchy, parents before children
    pub fn flattened_concepts(&self) -> Vec<&CodeSystemConcept> {
        fn walk<'a>(concepts: &'a [CodeSystemConcept], out: &mut Vec<&'a CodeSystemConcept>) {
            for concept in concepts {
                out.push(concept);
                if let Some(children) = &concept.concept {
                    walk(children, out);
                }
            }
        }

        let mut out = Vec::new();
        if let Some(concepts) = &self.concept {
            walk(concepts, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hierarchy_is_flattened() {
        let cs: CodeSystem = serde_json::from_value(json!({
            "resourceType": "CodeSystem",
            "url": "http://example.org/cs",
            "content": "complete",
            "concept": [
                { "code": "parent", "concept": [{ "code": "child", "display": "Child" }] },
                { "code": "other" }
            ]
        }))
        .unwrap();

        let codes: Vec<_> = cs.flattened_concepts().iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["parent", "child", "other"]);
        assert_eq!(cs.content, Some(CodeSystemContentMode::Complete));
    }
}

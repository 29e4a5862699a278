//! FHIR ElementDefinition model
//!
//! Version-agnostic model for ElementDefinition (used in StructureDefinition
//! snapshots and differentials).
//!
//! The type-suffixed value families (`fixed[x]`, `pattern[x]`,
//! `defaultValue[x]`, `minValue[x]`, `maxValue[x]`) are not kept as loose JSON
//! keys. Deserialization lifts them into [`PolymorphicFields`], which holds at
//! most one [`PolymorphicField`] per [`PolymorphicKind`].

use super::complex::{one_or_many, Reference};
use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// FHIR ElementDefinition - defines an element in a resource or data type structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "ElementDefinitionRepr", into = "ElementDefinitionRepr")]
pub struct ElementDefinition {
    /// Unique id for inter-element referencing
    pub id: Option<String>,

    /// Path of the element in the hierarchy (e.g., "Patient.name")
    pub path: String,

    /// Codes that define how this element is represented
    pub representation: Option<Vec<PropertyRepresentation>>,

    /// Name for this particular element (in a slice)
    pub slice_name: Option<String>,

    /// If this slice definition constrains an inherited slice
    pub slice_is_constraining: Option<bool>,

    /// Name for element to display with or prompt for element
    pub label: Option<String>,

    /// Corresponding codes in terminologies (Coding list)
    pub code: Option<Vec<Value>>,

    /// Short label
    pub short: Option<String>,

    /// Full formal definition
    pub definition: Option<String>,

    /// Comments about the use of this element
    pub comment: Option<String>,

    /// Why this resource has been created
    pub requirements: Option<String>,

    /// Other names
    pub alias: Option<Vec<String>>,

    /// Minimum cardinality
    pub min: Option<u32>,

    /// Maximum cardinality (can be "*")
    pub max: Option<String>,

    /// Base definition information
    pub base: Option<ElementDefinitionBase>,

    /// Reference to definition of content if present
    pub content_reference: Option<String>,

    /// Data type and profile for this element
    pub types: Option<Vec<ElementDefinitionType>>,

    /// Implicit meaning when this element is missing
    pub meaning_when_missing: Option<String>,

    /// What the order of the elements means
    pub order_meaning: Option<String>,

    /// Example values (label + value[x])
    pub example: Option<Vec<Value>>,

    /// Max length for strings
    pub max_length: Option<i32>,

    /// Reference to invariant about presence
    pub condition: Option<Vec<String>>,

    /// Condition that must evaluate to true
    pub constraint: Option<Vec<ElementDefinitionConstraint>>,

    /// If this element must be supported
    pub must_support: Option<bool>,

    /// If this modifies the meaning of other elements
    pub is_modifier: Option<bool>,

    /// Reason that this element is marked as a modifier
    pub is_modifier_reason: Option<String>,

    /// Include when in summary
    pub is_summary: Option<bool>,

    /// ValueSet details if this is coded
    pub binding: Option<ElementDefinitionBinding>,

    /// Map element to another set of definitions
    pub mapping: Option<Vec<ElementDefinitionMapping>>,

    /// This element is sliced - slices follow
    pub slicing: Option<ElementDefinitionSlicing>,

    /// `fixed[x]`, `pattern[x]`, `defaultValue[x]`, `minValue[x]`, `maxValue[x]`
    pub polymorphic: PolymorphicFields,

    /// Additional content beyond core fields (extension, modifierExtension, ...)
    pub extensions: Map<String, Value>,
}

/// Wire shape of [`ElementDefinition`]; polymorphic keys live in `extensions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementDefinitionRepr {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    representation: Option<Vec<PropertyRepresentation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slice_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slice_is_constraining: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    short: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<ElementDefinitionBase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    types: Option<Vec<ElementDefinitionType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meaning_when_missing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_meaning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_length: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    constraint: Option<Vec<ElementDefinitionConstraint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    must_support: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_modifier: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_modifier_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_summary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    binding: Option<ElementDefinitionBinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mapping: Option<Vec<ElementDefinitionMapping>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slicing: Option<ElementDefinitionSlicing>,
    #[serde(flatten)]
    extensions: Map<String, Value>,
}

impl From<ElementDefinitionRepr> for ElementDefinition {
    fn from(repr: ElementDefinitionRepr) -> Self {
        let mut polymorphic = PolymorphicFields::default();
        let mut extensions = Map::new();
        for (key, value) in repr.extensions {
            match PolymorphicKind::split_key(&key) {
                Some((kind, suffix)) => {
                    polymorphic.set(PolymorphicField::new(kind, suffix, value));
                }
                None => {
                    extensions.insert(key, value);
                }
            }
        }

        Self {
            id: repr.id,
            path: repr.path,
            representation: repr.representation,
            slice_name: repr.slice_name,
            slice_is_constraining: repr.slice_is_constraining,
            label: repr.label,
            code: repr.code,
            short: repr.short,
            definition: repr.definition,
            comment: repr.comment,
            requirements: repr.requirements,
            alias: repr.alias,
            min: repr.min,
            max: repr.max,
            base: repr.base,
            content_reference: repr.content_reference,
            types: repr.types,
            meaning_when_missing: repr.meaning_when_missing,
            order_meaning: repr.order_meaning,
            example: repr.example,
            max_length: repr.max_length,
            condition: repr.condition,
            constraint: repr.constraint,
            must_support: repr.must_support,
            is_modifier: repr.is_modifier,
            is_modifier_reason: repr.is_modifier_reason,
            is_summary: repr.is_summary,
            binding: repr.binding,
            mapping: repr.mapping,
            slicing: repr.slicing,
            polymorphic,
            extensions,
        }
    }
}

impl From<ElementDefinition> for ElementDefinitionRepr {
    fn from(element: ElementDefinition) -> Self {
        let mut extensions = element.extensions;
        for field in element.polymorphic.into_iter() {
            extensions.insert(field.key(), field.value);
        }

        Self {
            id: element.id,
            path: element.path,
            representation: element.representation,
            slice_name: element.slice_name,
            slice_is_constraining: element.slice_is_constraining,
            label: element.label,
            code: element.code,
            short: element.short,
            definition: element.definition,
            comment: element.comment,
            requirements: element.requirements,
            alias: element.alias,
            min: element.min,
            max: element.max,
            base: element.base,
            content_reference: element.content_reference,
            types: element.types,
            meaning_when_missing: element.meaning_when_missing,
            order_meaning: element.order_meaning,
            example: element.example,
            max_length: element.max_length,
            condition: element.condition,
            constraint: element.constraint,
            must_support: element.must_support,
            is_modifier: element.is_modifier,
            is_modifier_reason: element.is_modifier_reason,
            is_summary: element.is_summary,
            binding: element.binding,
            mapping: element.mapping,
            slicing: element.slicing,
            extensions,
        }
    }
}

/// Family of a type-suffixed ElementDefinition value key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolymorphicKind {
    DefaultValue,
    FixedValue,
    Pattern,
    MinValue,
    MaxValue,
}

impl PolymorphicKind {
    pub const ALL: [PolymorphicKind; 5] = [
        PolymorphicKind::DefaultValue,
        PolymorphicKind::FixedValue,
        PolymorphicKind::Pattern,
        PolymorphicKind::MinValue,
        PolymorphicKind::MaxValue,
    ];

    /// JSON key prefix of this family
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::DefaultValue => "defaultValue",
            Self::FixedValue => "fixed",
            Self::Pattern => "pattern",
            Self::MinValue => "minValue",
            Self::MaxValue => "maxValue",
        }
    }

    /// Split `fixedString` into `(FixedValue, "String")`.
    ///
    /// The suffix must start with an uppercase letter so plain keys that merely
    /// share a prefix are left alone.
    pub fn split_key(key: &str) -> Option<(PolymorphicKind, &str)> {
        Self::ALL.iter().find_map(|kind| {
            key.strip_prefix(kind.prefix())
                .filter(|suffix| suffix.starts_with(|c: char| c.is_ascii_uppercase()))
                .map(|suffix| (*kind, suffix))
        })
    }
}

/// One `{prefix}{TypeSuffix}: value` entry
#[derive(Debug, Clone, PartialEq)]
pub struct PolymorphicField {
    pub kind: PolymorphicKind,
    pub type_suffix: String,
    pub value: Value,
}

impl PolymorphicField {
    pub fn new(kind: PolymorphicKind, type_suffix: impl Into<String>, value: Value) -> Self {
        Self {
            kind,
            type_suffix: type_suffix.into(),
            value,
        }
    }

    /// Full JSON key, e.g. `patternCodeableConcept`
    pub fn key(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.type_suffix)
    }
}

/// At most one [`PolymorphicField`] per [`PolymorphicKind`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolymorphicFields {
    fields: BTreeMap<PolymorphicKind, PolymorphicField>,
}

impl PolymorphicFields {
    pub fn get(&self, kind: PolymorphicKind) -> Option<&PolymorphicField> {
        self.fields.get(&kind)
    }

    /// Install a field, replacing whatever the family held before
    /// (regardless of its type suffix).
    pub fn set(&mut self, field: PolymorphicField) -> Option<PolymorphicField> {
        self.fields.insert(field.kind, field)
    }

    pub fn remove(&mut self, kind: PolymorphicKind) -> Option<PolymorphicField> {
        self.fields.remove(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolymorphicField> {
        self.fields.values()
    }
}

impl IntoIterator for PolymorphicFields {
    type Item = PolymorphicField;
    type IntoIter = std::collections::btree_map::IntoValues<PolymorphicKind, PolymorphicField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_values()
    }
}

/// How a property is represented when serialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyRepresentation {
    XmlAttr,
    XmlText,
    TypeAttr,
    CdaText,
    Xhtml,
}

/// Base definition information for an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ElementDefinitionBase {
    /// Path that identifies the base element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Min cardinality of the base element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,

    /// Max cardinality of the base element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

/// Data type for an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinitionType {
    /// Data type code
    pub code: String,

    /// Profile (StructureDefinition canonical URLs) that apply
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub profile: Option<Vec<String>>,

    /// Profile (StructureDefinition) for Reference/canonical target types
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_profile: Option<Vec<String>>,

    /// Aggregation modes for references (contained | referenced | bundled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Vec<AggregationMode>>,

    /// Versioning rule for references (either | independent | specific)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioning: Option<ReferenceVersionRules>,

    /// Extensions on the type entry (e.g. structuredefinition-fhir-type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Value>>,
}

/// Extension URL carrying the FHIR type of a `System.*` type code.
pub const FHIR_TYPE_EXTENSION: &str =
    "http://hl7.org/fhir/StructureDefinition/structuredefinition-fhir-type";

impl ElementDefinitionType {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    /// Value of the `structuredefinition-fhir-type` extension, if any
    pub fn fhir_type_extension(&self) -> Option<&str> {
        self.extension.as_ref()?.iter().find_map(|ext| {
            if ext.get("url").and_then(Value::as_str) != Some(FHIR_TYPE_EXTENSION) {
                return None;
            }
            ext.get("valueUrl")
                .or_else(|| ext.get("valueUri"))
                .and_then(Value::as_str)
        })
    }

    /// Target type names derived from `targetProfile` canonicals
    /// (`http://hl7.org/fhir/StructureDefinition/Patient` becomes `Patient`).
    pub fn target_types(&self) -> Vec<String> {
        self.target_profile
            .iter()
            .flatten()
            .filter_map(|url| url.rsplit('/').next())
            .map(|name| name.split('|').next().unwrap_or(name).to_string())
            .collect()
    }
}

/// How aggregated references are handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    Contained,
    Referenced,
    Bundled,
}

/// How reference versions are handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceVersionRules {
    Either,
    Independent,
    Specific,
}

/// Constraint on an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ElementDefinitionConstraint {
    /// Target of 'condition' reference
    pub key: String,

    /// Why this constraint is necessary or appropriate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,

    /// Severity (error | warning)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<ConstraintSeverity>,

    /// Human description of constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human: Option<String>,

    /// FHIRPath expression of constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// XPath expression of constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,

    /// Reference to original source of constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Severity of a constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintSeverity {
    Error,
    Warning,
}

/// Binding strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Required,
    Extensible,
    Preferred,
    Example,
}

impl BindingStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Extensible => "extensible",
            Self::Preferred => "preferred",
            Self::Example => "example",
        }
    }
}

/// ValueSet binding for a coded element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinitionBinding {
    /// Binding strength (required | extensible | preferred | example)
    pub strength: BindingStrength,

    /// Human explanation of the value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Source of value set (R4 and later)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,

    /// Source of value set (STU3, reference form)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set_reference: Option<Reference>,

    /// Source of value set (STU3, uri form)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set_uri: Option<String>,
}

impl ElementDefinitionBinding {
    /// Canonical URL of the bound value set, without a `|version` suffix.
    ///
    /// STU3 wraps the URL in `valueSetReference` (or `valueSetUri`); later
    /// releases use a plain `valueSet` canonical.
    pub fn value_set_url(&self, stu3: bool) -> Option<String> {
        let raw = if stu3 {
            self.value_set_reference
                .as_ref()
                .and_then(|r| r.reference.clone())
                .or_else(|| self.value_set_uri.clone())
        } else {
            self.value_set.clone()
        }?;
        Some(raw.split('|').next().unwrap_or(&raw).to_string())
    }
}

/// Mapping to another standard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDefinitionMapping {
    /// Reference to mapping declaration
    pub identity: String,

    /// Computable language of mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Details of the mapping
    pub map: String,

    /// Comments about the mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Slicing information for an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ElementDefinitionSlicing {
    /// Element values that are used to distinguish slices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<ElementDefinitionDiscriminator>>,

    /// Text description of how slicing works
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// If elements must be in same order as slices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,

    /// Slicing rules (closed | open | openAtEnd)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<SlicingRules>,
}

/// Discriminator for slicing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDefinitionDiscriminator {
    /// Type of discriminator (value | exists | pattern | type | profile)
    #[serde(rename = "type")]
    pub discriminator_type: DiscriminatorType,

    /// Path to element value
    pub path: String,
}

/// Type of slicing discriminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscriminatorType {
    Value,
    Exists,
    Pattern,
    Type,
    Profile,
}

/// Slicing rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlicingRules {
    Closed,
    Open,
    OpenAtEnd,
}

/// Snapshot - a set of elements that define the structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Snapshot {
    #[serde(default)]
    pub element: Vec<ElementDefinition>,
}

/// Differential - a set of elements that define changes from the base
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Differential {
    #[serde(default)]
    pub element: Vec<ElementDefinition>,
}

impl Snapshot {
    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// Get an element by path
    pub fn get_element(&self, path: &str) -> Option<&ElementDefinition> {
        self.element.iter().find(|e| e.path == path)
    }
}

impl Differential {
    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// Get an element by path
    pub fn get_element(&self, path: &str) -> Option<&ElementDefinition> {
        self.element.iter().find(|e| e.path == path)
    }
}

impl ElementDefinition {
    /// Create an element with only a path (and the same id) set
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: Some(path.clone()),
            path,
            ..Default::default()
        }
    }

    /// Element id, falling back to the path
    pub fn id_or_path(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.path)
    }

    /// Get the key for this element (path:sliceName for slices, just path otherwise)
    pub fn key(&self) -> String {
        if let Some(ref slice_name) = self.slice_name {
            format!("{}:{}", self.path, slice_name)
        } else {
            self.path.clone()
        }
    }

    /// Check if this element is a descendant of the given path
    pub fn is_descendant_of(&self, parent_path: &str) -> bool {
        self.path.starts_with(parent_path)
            && self.path.len() > parent_path.len()
            && self.path.as_bytes().get(parent_path.len()) == Some(&b'.')
    }

    /// Get type codes for this element
    pub fn type_codes(&self) -> Vec<String> {
        self.types
            .as_ref()
            .map(|types| types.iter().map(|t| t.code.clone()).collect())
            .unwrap_or_default()
    }
}

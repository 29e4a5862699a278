//! Property tree nodes

use crate::primitives::PrimitiveType;
use ferrite_models::BindingStrength;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Type of a property node.
///
/// Only [`PropertyType::Backbone`] carries children. A
/// [`PropertyType::LocalReference`] borrows the children of another node of
/// the same schema and is resolved at walk time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum PropertyType {
    /// FHIR primitive (`string`, `boolean`, `decimal`, ...)
    Primitive(PrimitiveType),
    /// Named complex data type, resolved through the schema (`HumanName`)
    Complex(String),
    /// Inline structure (`BackboneElement` or `Element`) with its own children
    Backbone {
        code: String,
        children: Vec<Property>,
    },
    /// Embedded resource, dispatched on its own `resourceType`
    Resource,
    /// `Reference` data type with the allowed target type names
    Reference { targets: Vec<String> },
    /// `#TypeName.path.to.node`
    LocalReference(String),
}

/// One field of a structural type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: PropertyType,

    #[serde(default)]
    pub multiple: bool,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set_strength: Option<BindingStrength>,
}

/// Children of every `_name` shadow property: `id` and `extension`.
pub static SHADOW_CHILDREN: Lazy<Vec<Property>> = Lazy::new(|| {
    vec![
        Property::new("id", PropertyType::Primitive(PrimitiveType::String)),
        Property::new("extension", PropertyType::Complex("Extension".to_string())).multiple(),
    ]
});

impl Property {
    pub fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty,
            multiple: false,
            required: false,
            choice_group: None,
            value_set_url: None,
            value_set_strength: None,
        }
    }

    /// Builder-style helpers, mostly for hand-built schemas.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn in_choice_group(mut self, group: impl Into<String>) -> Self {
        self.choice_group = Some(group.into());
        self
    }

    pub fn bound_to(mut self, url: impl Into<String>, strength: BindingStrength) -> Self {
        self.value_set_url = Some(url.into());
        self.value_set_strength = Some(strength);
        self
    }

    /// The `_name` side-channel property paired with a primitive
    pub fn shadow_of(primary: &Property) -> Self {
        Self {
            name: format!("_{}", primary.name),
            ty: PropertyType::Backbone {
                code: "Element".to_string(),
                children: SHADOW_CHILDREN.clone(),
            },
            multiple: primary.multiple,
            required: false,
            choice_group: None,
            value_set_url: None,
            value_set_strength: None,
        }
    }

    /// Textual type code (`string`, `HumanName`, `BackboneElement`, `#Questionnaire.item`)
    pub fn type_code(&self) -> &str {
        match &self.ty {
            PropertyType::Primitive(p) => p.as_str(),
            PropertyType::Complex(name) => name,
            PropertyType::Backbone { code, .. } => code,
            PropertyType::Resource => "Resource",
            PropertyType::Reference { .. } => "Reference",
            PropertyType::LocalReference(path) => path,
        }
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self.ty {
            PropertyType::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive().is_some()
    }

    /// Whether this is a `_name` side-channel property
    pub fn is_shadow(&self) -> bool {
        self.name.starts_with('_')
    }

    pub fn shadow_name(&self) -> String {
        format!("_{}", self.name)
    }

    /// Inline children (only for [`PropertyType::Backbone`])
    pub fn children(&self) -> Option<&[Property]> {
        match &self.ty {
            PropertyType::Backbone { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Property>> {
        match &mut self.ty {
            PropertyType::Backbone { children, .. } => Some(children),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_mirrors_cardinality_only() {
        let given = Property::new("given", PropertyType::Primitive(PrimitiveType::String))
            .multiple()
            .required()
            .in_choice_group("x");
        let shadow = Property::shadow_of(&given);

        assert_eq!(shadow.name, "_given");
        assert!(shadow.multiple);
        assert!(!shadow.required);
        assert!(shadow.choice_group.is_none());
        assert_eq!(shadow.type_code(), "Element");
        assert_eq!(shadow.children().unwrap().len(), 2);
        assert!(shadow.is_shadow());
    }

    #[test]
    fn property_serializes_with_tagged_type() {
        let prop = Property::new(
            "subject",
            PropertyType::Reference {
                targets: vec!["Patient".to_string()],
            },
        );
        let value = serde_json::to_value(&prop).unwrap();
        assert_eq!(value["type"]["kind"], "reference");
        assert_eq!(value["type"]["detail"]["targets"][0], "Patient");

        let back: Property = serde_json::from_value(value).unwrap();
        assert_eq!(back, prop);
    }
}

//! Conformance parser: StructureDefinitions, ValueSets and CodeSystems into a [`Schema`]

use crate::error::{Result, SchemaError};
use crate::primitives::{choice_suffix, PrimitiveType};
use crate::property::{Property, PropertyType};
use crate::schema::{Schema, TypeDefinition};
use ferrite_models::{
    Bundle, CodeSystem, ElementDefinition, ElementDefinitionType, FhirVersion,
    StructureDefinition, StructureDefinitionKind,
};
use std::collections::HashSet;

/// Parser settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserConfig {
    /// Selects how binding value set references are read
    pub fhir_version: FhirVersion,
}

/// Builds a [`Schema`] incrementally from conformance resources.
pub struct ConformanceParser {
    config: ParserConfig,
    pub(crate) schema: Schema,
    pub(crate) code_systems: Vec<CodeSystem>,
}

impl ConformanceParser {
    pub fn new(fhir_version: FhirVersion) -> Self {
        Self::with_config(ParserConfig { fhir_version })
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            schema: Schema::new(config.fhir_version),
            code_systems: Vec::new(),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn into_schema(self) -> Schema {
        self.schema
    }

    /// Remember a CodeSystem for later value set composition.
    /// Already known systems (same `url` or `id`) are ignored.
    pub fn load_code_system(&mut self, code_system: CodeSystem) {
        let duplicate = self.code_systems.iter().any(|known| {
            (!code_system.url.is_empty() && known.url == code_system.url)
                || (code_system.id.is_some() && known.id == code_system.id)
        });
        if duplicate {
            tracing::debug!(url = %code_system.url, "code system already loaded");
            return;
        }
        self.code_systems.push(code_system);
    }

    /// CodeSystems first, then dependency-sorted ValueSets, then
    /// StructureDefinitions of kind resource, complex-type or primitive-type.
    pub fn parse_bundle(&mut self, bundle: &Bundle) -> Result<()> {
        for code_system in bundle.code_systems()? {
            self.load_code_system(code_system);
        }

        let value_sets = Self::sort_value_set_dependencies(bundle.value_sets()?);
        let mut stored = 0;
        for value_set in &value_sets {
            if self.parse_value_set(value_set).is_some() {
                stored += 1;
            }
        }

        let mut parsed = 0;
        for sd in bundle.structure_definitions()? {
            if sd.kind == StructureDefinitionKind::Logical {
                continue;
            }
            self.parse_structure_definition(&sd)?;
            parsed += 1;
        }

        tracing::info!(
            code_systems = self.code_systems.len(),
            value_sets = stored,
            types = parsed,
            "conformance bundle parsed"
        );
        Ok(())
    }

    /// Parse one StructureDefinition snapshot into a [`TypeDefinition`]
    /// stored under the definition's id (or url when it has no id).
    pub fn parse_structure_definition(
        &mut self,
        sd: &StructureDefinition,
    ) -> Result<&TypeDefinition> {
        let key = sd
            .identity()
            .ok_or_else(|| {
                SchemaError::MissingIdentity(
                    sd.name
                        .clone()
                        .or_else(|| sd.type_.clone())
                        .unwrap_or_default(),
                )
            })?
            .to_string();

        let elements = sd.snapshot_elements();
        let Some(root) = elements.first() else {
            return Err(SchemaError::MissingSnapshot(key));
        };
        let root_id = root.id_or_path().to_string();

        let usable: Vec<&ElementDefinition> = elements
            .iter()
            .skip(1)
            .filter(|element| {
                let id = element.id_or_path();
                if id.contains(':') {
                    tracing::debug!(element = %id, "skipping slice element");
                    false
                } else {
                    true
                }
            })
            .collect();
        check_parents(&root_id, &usable)?;

        let builder = TreeBuilder {
            elements: &usable,
            stu3: self.config.fhir_version.uses_value_set_reference(),
        };
        let properties = add_shadow_properties(builder.children_of(&root_id)?);

        let def = TypeDefinition {
            name: sd.type_.clone().unwrap_or_else(|| root.path.clone()),
            kind: sd.kind,
            url: sd.url.clone(),
            properties,
        };
        tracing::debug!(
            key = %key,
            properties = def.properties.len(),
            "structure definition parsed"
        );
        self.schema.types.insert(key.clone(), def);
        self.schema
            .types
            .get(&key)
            .ok_or(SchemaError::UnknownType(key))
    }
}

/// Every element's parent path must exist (or be the root).
fn check_parents(root_id: &str, elements: &[&ElementDefinition]) -> Result<()> {
    let ids: HashSet<&str> = elements.iter().map(|e| e.id_or_path()).collect();
    for element in elements {
        let id = element.id_or_path();
        let Some((parent, _)) = id.rsplit_once('.') else {
            continue;
        };
        if parent != root_id && !ids.contains(parent) {
            return Err(SchemaError::MissingParent {
                element: id.to_string(),
                parent: parent.to_string(),
            });
        }
    }
    Ok(())
}

struct TreeBuilder<'a> {
    elements: &'a [&'a ElementDefinition],
    stu3: bool,
}

impl TreeBuilder<'_> {
    /// Properties for the elements exactly one segment below `parent_id`.
    fn children_of(&self, parent_id: &str) -> Result<Vec<Property>> {
        let prefix = format!("{}.", parent_id);
        let mut properties = Vec::new();
        for element in self.elements.iter().copied() {
            let id = element.id_or_path();
            let Some(rest) = id.strip_prefix(&prefix) else {
                continue;
            };
            if rest.is_empty() || rest.contains('.') {
                continue;
            }
            properties.extend(self.element_properties(element, rest)?);
        }
        Ok(properties)
    }

    fn element_properties(&self, element: &ElementDefinition, name: &str) -> Result<Vec<Property>> {
        let id = element.id_or_path();
        let max = element
            .max
            .as_deref()
            .ok_or_else(|| SchemaError::MissingMax(id.to_string()))?;
        let multiple = max != "1";
        let required = element.min.unwrap_or(0) >= 1;
        let (value_set_url, value_set_strength) = match &element.binding {
            Some(binding) => (binding.value_set_url(self.stu3), Some(binding.strength)),
            None => (None, None),
        };

        let template = |name: String, ty: PropertyType| Property {
            name,
            ty,
            multiple,
            required,
            choice_group: None,
            value_set_url: value_set_url.clone(),
            value_set_strength,
        };

        let types: &[ElementDefinitionType] = element.types.as_deref().unwrap_or(&[]);

        if let Some(base) = name.strip_suffix("[x]") {
            return Ok(types
                .iter()
                .map(|ty| {
                    let mut arm = template(
                        format!("{}{}", base, choice_suffix(&arm_type_name(ty))),
                        property_type(ty),
                    );
                    arm.choice_group = Some(base.to_string());
                    arm
                })
                .collect());
        }

        match types {
            [] => match &element.content_reference {
                Some(reference) => Ok(vec![template(
                    name.to_string(),
                    PropertyType::LocalReference(local_reference(reference)),
                )]),
                None => {
                    tracing::warn!(element = %id, "element has no type; skipped");
                    Ok(Vec::new())
                }
            },
            [single] if single.code == "BackboneElement" || single.code == "Element" => {
                let children = self.children_of(id)?;
                Ok(vec![template(
                    name.to_string(),
                    PropertyType::Backbone {
                        code: single.code.clone(),
                        children,
                    },
                )])
            }
            [single] => Ok(vec![template(name.to_string(), property_type(single))]),
            many if many.iter().all(|t| t.code == "Reference") => {
                let mut targets: Vec<String> = Vec::new();
                for target in many.iter().flat_map(|t| t.target_types()) {
                    if !targets.contains(&target) {
                        targets.push(target);
                    }
                }
                Ok(vec![template(
                    name.to_string(),
                    PropertyType::Reference { targets },
                )])
            }
            many => {
                let codes: Vec<&str> = many.iter().map(|t| t.code.as_str()).collect();
                tracing::warn!(
                    element = %id,
                    types = ?codes,
                    "unsupported multi-type element; skipped"
                );
                Ok(Vec::new())
            }
        }
    }
}

/// Type name used for a choice arm suffix; `System.*` codes use their FHIR type.
fn arm_type_name(ty: &ElementDefinitionType) -> String {
    match PrimitiveType::from_system_code(&ty.code, ty.fhir_type_extension()) {
        Some(primitive) => primitive.as_str().to_string(),
        None => ty.code.clone(),
    }
}

fn property_type(ty: &ElementDefinitionType) -> PropertyType {
    let code = ty.code.as_str();
    if let Some(primitive) = PrimitiveType::from_system_code(code, ty.fhir_type_extension()) {
        return PropertyType::Primitive(primitive);
    }
    if let Some(primitive) = PrimitiveType::from_code(code) {
        return PropertyType::Primitive(primitive);
    }
    match code {
        "Resource" | "DomainResource" => PropertyType::Resource,
        "Reference" => PropertyType::Reference {
            targets: ty.target_types(),
        },
        "BackboneElement" | "Element" => PropertyType::Backbone {
            code: code.to_string(),
            children: Vec::new(),
        },
        other => PropertyType::Complex(other.to_string()),
    }
}

/// `http://hl7.org/fhir/StructureDefinition/Questionnaire#Questionnaire.item`
/// and `#Questionnaire.item` both become `#Questionnaire.item`.
fn local_reference(reference: &str) -> String {
    match reference.find('#') {
        Some(pos) => reference[pos..].to_string(),
        None => format!("#{}", reference),
    }
}

/// Insert a `_name` side-channel property after every primitive property
/// that does not already have one, recursing into inline structures.
fn add_shadow_properties(properties: Vec<Property>) -> Vec<Property> {
    let names: HashSet<String> = properties.iter().map(|p| p.name.clone()).collect();
    let mut out = Vec::with_capacity(properties.len() * 2);
    for mut property in properties {
        if let Some(children) = property.children_mut() {
            let taken = std::mem::take(children);
            *children = add_shadow_properties(taken);
        }
        let shadow = (property.is_primitive()
            && !property.is_shadow()
            && !names.contains(&property.shadow_name()))
        .then(|| Property::shadow_of(&property));
        out.push(property);
        out.extend(shadow);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_models::BindingStrength;
    use serde_json::json;

    fn sd(elements: serde_json::Value) -> StructureDefinition {
        StructureDefinition::from_value(&json!({
            "resourceType": "StructureDefinition",
            "id": "Test",
            "url": "http://hl7.org/fhir/StructureDefinition/Test",
            "kind": "resource",
            "type": "Test",
            "snapshot": { "element": elements }
        }))
        .unwrap()
    }

    #[test]
    fn single_string_element_gets_shadow() {
        let mut parser = ConformanceParser::new(FhirVersion::R4);
        let def = parser
            .parse_structure_definition(&sd(json!([
                { "id": "Test", "path": "Test", "min": 0, "max": "*" },
                { "id": "Test.name", "path": "Test.name", "min": 1, "max": "1",
                  "type": [{ "code": "string" }] }
            ])))
            .unwrap();

        assert_eq!(def.properties.len(), 2);
        let name = &def.properties[0];
        assert_eq!(name.name, "name");
        assert_eq!(name.type_code(), "string");
        assert!(name.required);
        assert!(!name.multiple);
        assert_eq!(def.properties[1].name, "_name");
        assert_eq!(def.properties[1].type_code(), "Element");
    }

    #[test]
    fn backbone_children_nest_and_choice_expands() {
        let mut parser = ConformanceParser::new(FhirVersion::R4);
        let def = parser
            .parse_structure_definition(&sd(json!([
                { "id": "Test", "path": "Test", "min": 0, "max": "*" },
                { "id": "Test.part", "path": "Test.part", "min": 0, "max": "*",
                  "type": [{ "code": "BackboneElement" }] },
                { "id": "Test.part.value[x]", "path": "Test.part.value[x]", "min": 1, "max": "1",
                  "type": [{ "code": "string" }, { "code": "Quantity" }] },
                { "id": "Test.part.nested", "path": "Test.part.nested", "min": 0, "max": "1",
                  "type": [{ "code": "BackboneElement" }] },
                { "id": "Test.part.nested.flag", "path": "Test.part.nested.flag", "min": 0, "max": "1",
                  "type": [{ "code": "boolean" }] }
            ])))
            .unwrap();

        let part = &def.properties[0];
        assert!(part.multiple);
        let children = part.children().unwrap();
        let names: Vec<_> = children.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["valueString", "_valueString", "valueQuantity", "nested"]);
        assert_eq!(children[0].choice_group.as_deref(), Some("value"));
        assert_eq!(children[2].choice_group.as_deref(), Some("value"));
        assert!(children[2].required);

        let nested = children[3].children().unwrap();
        assert_eq!(nested[0].name, "flag");
        assert_eq!(nested[1].name, "_flag");
    }

    #[test]
    fn reference_only_and_mixed_multi_types() {
        let mut parser = ConformanceParser::new(FhirVersion::R4);
        let def = parser
            .parse_structure_definition(&sd(json!([
                { "id": "Test", "path": "Test" },
                { "id": "Test.subject", "path": "Test.subject", "min": 0, "max": "1",
                  "type": [
                    { "code": "Reference", "targetProfile": ["http://hl7.org/fhir/StructureDefinition/Patient"] },
                    { "code": "Reference", "targetProfile": ["http://hl7.org/fhir/StructureDefinition/Group"] }
                  ] },
                { "id": "Test.odd", "path": "Test.odd", "min": 0, "max": "1",
                  "type": [{ "code": "string" }, { "code": "Reference" }] }
            ])))
            .unwrap();

        assert_eq!(def.properties.len(), 1);
        assert_eq!(
            def.properties[0].ty,
            PropertyType::Reference {
                targets: vec!["Patient".to_string(), "Group".to_string()]
            }
        );
    }

    #[test]
    fn missing_max_is_fatal() {
        let mut parser = ConformanceParser::new(FhirVersion::R4);
        let err = parser
            .parse_structure_definition(&sd(json!([
                { "id": "Test", "path": "Test" },
                { "id": "Test.name", "path": "Test.name", "min": 0, "type": [{ "code": "string" }] }
            ])))
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingMax(id) if id == "Test.name"));
    }

    #[test]
    fn missing_parent_is_fatal() {
        let mut parser = ConformanceParser::new(FhirVersion::R4);
        let err = parser
            .parse_structure_definition(&sd(json!([
                { "id": "Test", "path": "Test" },
                { "id": "Test.contact.name", "path": "Test.contact.name", "min": 0, "max": "1",
                  "type": [{ "code": "string" }] }
            ])))
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingParent { parent, .. } if parent == "Test.contact"));
    }

    #[test]
    fn slices_are_skipped_and_content_reference_is_local() {
        let mut parser = ConformanceParser::new(FhirVersion::R5);
        let def = parser
            .parse_structure_definition(&sd(json!([
                { "id": "Test", "path": "Test" },
                { "id": "Test.item", "path": "Test.item", "min": 0, "max": "*",
                  "type": [{ "code": "BackboneElement" }] },
                { "id": "Test.item:special", "path": "Test.item", "sliceName": "special",
                  "min": 0, "max": "1", "type": [{ "code": "BackboneElement" }] },
                { "id": "Test.item.item", "path": "Test.item.item", "min": 0, "max": "*",
                  "contentReference": "http://hl7.org/fhir/StructureDefinition/Test#Test.item" }
            ])))
            .unwrap();

        assert_eq!(def.properties.len(), 1);
        let inner = &def.properties[0].children().unwrap()[0];
        assert_eq!(inner.ty, PropertyType::LocalReference("#Test.item".to_string()));
        assert!(inner.multiple);
    }

    #[test]
    fn binding_reference_follows_configured_version() {
        let elements = json!([
            { "id": "Test", "path": "Test" },
            { "id": "Test.status", "path": "Test.status", "min": 1, "max": "1",
              "type": [{ "code": "code" }],
              "binding": {
                "strength": "required",
                "valueSet": "http://hl7.org/fhir/ValueSet/r4|4.0.1",
                "valueSetReference": { "reference": "http://hl7.org/fhir/ValueSet/stu3" }
              } }
        ]);

        let mut r4 = ConformanceParser::new(FhirVersion::R4);
        let status = &r4.parse_structure_definition(&sd(elements.clone())).unwrap().properties[0];
        assert_eq!(status.value_set_url.as_deref(), Some("http://hl7.org/fhir/ValueSet/r4"));
        assert_eq!(status.value_set_strength, Some(BindingStrength::Required));

        let mut stu3 = ConformanceParser::new(FhirVersion::Stu3);
        let status = &stu3.parse_structure_definition(&sd(elements)).unwrap().properties[0];
        assert_eq!(status.value_set_url.as_deref(), Some("http://hl7.org/fhir/ValueSet/stu3"));
    }

    #[test]
    fn id_falls_back_to_url() {
        let mut parser = ConformanceParser::new(FhirVersion::R4);
        let mut def = sd(json!([{ "path": "Test" }]));
        def.id = None;
        parser.parse_structure_definition(&def).unwrap();
        assert!(parser
            .schema()
            .types
            .contains_key("http://hl7.org/fhir/StructureDefinition/Test"));

        def.url = None;
        assert!(matches!(
            parser.parse_structure_definition(&def),
            Err(SchemaError::MissingIdentity(_))
        ));
    }

    #[test]
    fn system_types_become_primitives() {
        let mut parser = ConformanceParser::new(FhirVersion::R4);
        let def = parser
            .parse_structure_definition(&sd(json!([
                { "id": "Test", "path": "Test" },
                { "id": "Test.id", "path": "Test.id", "min": 0, "max": "1",
                  "type": [{
                    "code": "http://hl7.org/fhirpath/System.String",
                    "extension": [{
                      "url": "http://hl7.org/fhir/StructureDefinition/structuredefinition-fhir-type",
                      "valueUrl": "id"
                    }]
                  }] }
            ])))
            .unwrap();
        assert_eq!(def.properties[0].primitive(), Some(PrimitiveType::Id));
    }
}

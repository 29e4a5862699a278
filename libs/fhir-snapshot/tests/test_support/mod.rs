#![allow(dead_code)]

use ferrite_context::DefaultFhirContext;
use ferrite_models::{Bundle, StructureDefinition};
use serde_json::{json, Value};
use std::sync::OnceLock;

const CONFORMANCE_R4: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../testdata/conformance-r4.json"
));

static CONTEXT_R4: OnceLock<DefaultFhirContext> = OnceLock::new();

/// Core definitions of the R4 conformance fixture
pub fn context_r4() -> &'static DefaultFhirContext {
    CONTEXT_R4.get_or_init(|| {
        let value: Value = serde_json::from_str(CONFORMANCE_R4).expect("fixture is valid JSON");
        let bundle = Bundle::from_value(&value).expect("fixture is a Bundle");
        DefaultFhirContext::from_bundle(&bundle)
    })
}

/// Constraint profile on `base` with the given differential elements
pub fn profile(id: &str, type_name: &str, base: &str, differential: Value) -> StructureDefinition {
    StructureDefinition::from_value(&json!({
        "resourceType": "StructureDefinition",
        "id": id,
        "url": format!("http://example.org/fhir/StructureDefinition/{}", id),
        "name": id,
        "kind": "resource",
        "abstract": false,
        "type": type_name,
        "baseDefinition": base,
        "derivation": "constraint",
        "differential": { "element": differential }
    }))
    .expect("valid profile")
}

pub fn bundle_of(profiles: &[StructureDefinition]) -> Bundle {
    let mut bundle = Bundle::collection();
    for sd in profiles {
        bundle.add_resource(sd.to_value().expect("profile serializes"));
    }
    bundle
}

pub fn paths(sd: &StructureDefinition) -> Vec<&str> {
    sd.snapshot_elements().iter().map(|e| e.path.as_str()).collect()
}

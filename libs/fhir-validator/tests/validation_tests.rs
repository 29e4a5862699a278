mod test_support;

use ferrite_schema::Schema;
use ferrite_validator::{
    ConfigError, ExtensibleHandling, FhirVersion, IssueCode, Preset, Severity, UnknownPropertyMode,
    ValidationOutcome, Validator, ValidatorConfig, ValidatorError, INITIAL_RESOURCE_ID,
};
use serde_json::{json, Value};
use std::sync::Arc;
use test_support::schema_r4;

fn validator() -> Validator {
    Validator::from_config(schema_r4(), &ValidatorConfig::preset(Preset::Server)).unwrap()
}

fn validator_with(config: ValidatorConfig) -> Validator {
    Validator::from_config(schema_r4(), &config).unwrap()
}

fn locations(outcome: &ValidationOutcome) -> Vec<&str> {
    outcome.messages.iter().map(|m| m.location.as_str()).collect()
}

#[test]
fn unknown_bundle_type_is_the_only_error() {
    let outcome = validator()
        .validate(&json!({ "resourceType": "Bundle", "type": "test" }))
        .unwrap();

    assert!(!outcome.valid);
    assert_eq!(outcome.messages.len(), 1);
    let message = &outcome.messages[0];
    assert_eq!(message.severity, Severity::Error);
    assert_eq!(message.code, IssueCode::CodeInvalid);
    assert_eq!(message.location, "Bundle.type");
    assert_eq!(message.resource_id, INITIAL_RESOURCE_ID);
}

#[test]
fn valid_collection_bundle() {
    let outcome = validator()
        .validate(&json!({
            "resourceType": "Bundle",
            "id": "b1",
            "type": "collection",
            "total": 1,
            "entry": [{
                "fullUrl": "http://example.org/Patient/1",
                "resource": {
                    "resourceType": "Patient",
                    "id": "1",
                    "gender": "female",
                    "birthDate": "1980-02"
                }
            }]
        }))
        .unwrap();

    assert!(outcome.valid, "{:?}", outcome.messages);
    assert!(outcome.messages.is_empty());
    assert_eq!(outcome.resource_type, "Bundle");
}

#[test]
fn missing_required_properties() {
    let outcome = validator()
        .validate(&json!({ "resourceType": "Observation", "id": "o1" }))
        .unwrap();

    assert!(!outcome.valid);
    assert_eq!(locations(&outcome), vec!["Observation.status", "Observation.code"]);
    for message in &outcome.messages {
        assert_eq!(message.code, IssueCode::Required);
        assert_eq!(message.message, "Missing property");
        assert_eq!(message.resource_id, "o1");
    }
}

#[test]
fn nested_required_properties_use_indexed_paths() {
    let outcome = validator()
        .validate(&json!({
            "resourceType": "Observation",
            "status": "final",
            "code": { "text": "Blood pressure" },
            "component": [
                { "code": { "text": "Systolic" }, "valueString": "120" },
                { "valueString": "80" }
            ],
            "text": { "status": "generated" }
        }))
        .unwrap();

    assert_eq!(
        locations(&outcome),
        vec!["Observation.text.div", "Observation.component[1].code"]
    );
}

#[test]
fn required_choice_group_is_reported_once() {
    let mut schema: Schema = (*schema_r4()).clone();
    let observation = schema.types.get_mut("Observation").unwrap();
    for prop in &mut observation.properties {
        if prop.choice_group.as_deref() == Some("value") {
            prop.required = true;
        }
    }
    let validator = Validator::from_config(
        Arc::new(schema),
        &ValidatorConfig::preset(Preset::Server),
    )
    .unwrap();

    let base = json!({
        "resourceType": "Observation",
        "status": "final",
        "code": { "text": "Weight" }
    });
    let outcome = validator.validate(&base).unwrap();
    assert_eq!(locations(&outcome), vec!["Observation.value[x]"]);

    let mut with_value = base.clone();
    with_value["valueQuantity"] = json!({ "value": 72.5, "unit": "kg" });
    assert!(validator.validate(&with_value).unwrap().messages.is_empty());
}

#[test]
fn required_choice_group_satisfied_by_primitive_extension_only() {
    let mut schema: Schema = (*schema_r4()).clone();
    let observation = schema.types.get_mut("Observation").unwrap();
    for prop in &mut observation.properties {
        if prop.choice_group.as_deref() == Some("value") {
            prop.required = true;
        }
    }
    let validator = Validator::from_config(
        Arc::new(schema),
        &ValidatorConfig::preset(Preset::Server),
    )
    .unwrap();

    let outcome = validator
        .validate(&json!({
            "resourceType": "Observation",
            "status": "final",
            "code": { "text": "Weight" },
            "_valueString": { "id": "v1" }
        }))
        .unwrap();
    assert!(outcome.messages.is_empty(), "{:?}", outcome.messages);
    assert!(outcome.valid);
}

#[test]
fn unknown_properties_follow_the_configured_severity() {
    let resource = json!({ "resourceType": "Patient", "nickname": "PJ" });

    let outcome = validator().validate(&resource).unwrap();
    assert_eq!(outcome.messages.len(), 1);
    assert_eq!(outcome.messages[0].severity, Severity::Error);
    assert_eq!(outcome.messages[0].location, "Patient.nickname");
    assert_eq!(outcome.messages[0].code, IssueCode::Structure);

    let lenient = validator_with(
        ValidatorConfig::builder()
            .unknown_properties(UnknownPropertyMode::Warning)
            .build(),
    );
    let outcome = lenient.validate(&resource).unwrap();
    assert!(outcome.valid);
    assert_eq!(outcome.warning_count(), 1);
}

#[test]
fn unknown_property_inside_primitive_extension() {
    let outcome = validator()
        .validate(&json!({
            "resourceType": "Patient",
            "birthDate": "1974-12-25",
            "_birthDate": { "id": "bd", "note": "guessed" }
        }))
        .unwrap();

    assert_eq!(locations(&outcome), vec!["Patient._birthDate.note"]);
}

#[test]
fn lexical_errors_carry_type_path_and_value() {
    let outcome = validator()
        .validate(&json!({
            "resourceType": "Patient",
            "active": "true",
            "birthDate": "1974-13-01",
            "multipleBirthInteger": 1.5
        }))
        .unwrap();

    assert_eq!(outcome.error_count(), 3);
    assert!(outcome.messages.iter().all(|m| m.code == IssueCode::Value));
    assert!(outcome.messages[0]
        .message
        .contains("Invalid boolean 'true' at Patient.active"));
    assert!(outcome.messages[1]
        .message
        .contains("Invalid date '1974-13-01' at Patient.birthDate"));
    assert!(outcome.messages[2]
        .message
        .contains("Invalid integer '1.5' at Patient.multipleBirthInteger"));
}

#[test]
fn array_shape_is_checked() {
    let outcome = validator()
        .validate(&json!({
            "resourceType": "Patient",
            "active": [true],
            "name": { "family": "Chalmers" }
        }))
        .unwrap();

    assert_eq!(outcome.messages.len(), 2);
    assert_eq!(outcome.messages[0].location, "Patient.active");
    assert_eq!(outcome.messages[0].message, "Property should not be an array");
    assert_eq!(outcome.messages[1].location, "Patient.name");
    assert_eq!(outcome.messages[1].message, "Property is not an array");
}

#[test]
fn extensible_binding_warns_unless_ignored() {
    let resource = json!({
        "resourceType": "Patient",
        "maritalStatus": {
            "coding": [
                { "system": "http://terminology.hl7.org/CodeSystem/v3-MaritalStatus", "code": "M" },
                { "system": "http://terminology.hl7.org/CodeSystem/v3-MaritalStatus", "code": "X" }
            ]
        }
    });

    let outcome = validator().validate(&resource).unwrap();
    assert!(outcome.valid);
    assert_eq!(outcome.messages.len(), 1);
    assert_eq!(outcome.messages[0].severity, Severity::Warning);
    assert_eq!(outcome.messages[0].location, "Patient.maritalStatus.coding[1]");

    let ignoring = validator_with(
        ValidatorConfig::builder()
            .extensible_handling(ExtensibleHandling::Ignore)
            .build(),
    );
    assert!(ignoring.validate(&resource).unwrap().messages.is_empty());
}

#[test]
fn required_binding_uses_expansion() {
    let v = validator();
    let ok = json!({ "resourceType": "Observation", "status": "final", "code": { "text": "x" } });
    assert!(v.validate(&ok).unwrap().messages.is_empty());

    let bad = json!({ "resourceType": "Observation", "status": "done", "code": { "text": "x" } });
    let outcome = v.validate(&bad).unwrap();
    assert_eq!(locations(&outcome), vec!["Observation.status"]);
    assert_eq!(outcome.messages[0].code, IssueCode::CodeInvalid);
}

#[test]
fn terminology_off_skips_bindings() {
    let ingestion = validator_with(ValidatorConfig::preset(Preset::Ingestion));
    let outcome = ingestion
        .validate(&json!({ "resourceType": "Bundle", "type": "test" }))
        .unwrap();
    assert!(outcome.messages.is_empty());
}

#[test]
fn reference_target_type_is_checked() {
    let v = validator();
    let observation = |reference: &str| {
        json!({
            "resourceType": "Observation",
            "status": "final",
            "code": { "text": "x" },
            "subject": { "reference": reference }
        })
    };

    assert!(v.validate(&observation("Patient/123")).unwrap().valid);
    assert!(v.validate(&observation("#p1")).unwrap().messages.is_empty());

    let outcome = v.validate(&observation("Organization/1")).unwrap();
    assert_eq!(locations(&outcome), vec!["Observation.subject"]);
    assert_eq!(outcome.messages[0].code, IssueCode::Invalid);
    assert!(outcome.messages[0].message.contains("'Organization'"));

    let strict = validator_with(ValidatorConfig::preset(Preset::Publication));
    let outcome = strict.validate(&observation("#p1")).unwrap();
    assert!(outcome.valid);
    assert_eq!(outcome.warning_count(), 1);
}

#[test]
fn embedded_resources_report_their_own_id() {
    let outcome = validator()
        .validate(&json!({
            "resourceType": "Bundle",
            "id": "b1",
            "type": "batch",
            "entry": [
                { "resource": { "resourceType": "Patient", "id": "p1", "gender": "bogus" } },
                { "resource": { "resourceType": "Organization", "alias": "ACME" } }
            ]
        }))
        .unwrap();

    assert_eq!(outcome.messages.len(), 2);
    assert_eq!(outcome.messages[0].location, "Bundle.entry[0].resource.gender");
    assert_eq!(outcome.messages[0].resource_id, "p1");
    assert_eq!(outcome.messages[1].location, "Bundle.entry[1].resource.alias");
    assert_eq!(outcome.messages[1].resource_id, "b1");
}

#[test]
fn contained_resources_are_validated() {
    let outcome = validator()
        .validate(&json!({
            "resourceType": "Patient",
            "contained": [
                { "resourceType": "Organization", "id": "org1", "active": "yes" },
                { "name": "no type" }
            ],
            "managingOrganization": { "reference": "#org1" }
        }))
        .unwrap();

    assert_eq!(
        locations(&outcome),
        vec!["Patient.contained[0].active", "Patient.contained[1].resourceType"]
    );
    assert_eq!(outcome.messages[0].resource_id, "org1");
    assert_eq!(outcome.messages[1].resource_id, INITIAL_RESOURCE_ID);
}

#[test]
fn unknown_resource_type_is_fatal() {
    let outcome = validator()
        .validate(&json!({ "resourceType": "Spaceship", "id": "s1" }))
        .unwrap();

    assert!(!outcome.valid);
    assert_eq!(outcome.messages.len(), 1);
    assert_eq!(outcome.messages[0].severity, Severity::Fatal);
    assert_eq!(outcome.messages[0].location, "Spaceship");
}

#[test]
fn input_that_is_not_a_resource_is_an_error() {
    let v = validator();
    assert!(matches!(v.validate(&json!([1, 2])), Err(ValidatorError::NotAnObject)));
    assert!(matches!(
        v.validate(&json!({ "id": "x" })),
        Err(ValidatorError::MissingResourceType)
    ));

    let batch = v.validate_batch(&[json!({ "resourceType": "Patient" }), Value::Null]);
    assert!(batch[0].as_ref().unwrap().valid);
    assert!(batch[1].is_err());
}

#[test]
fn message_limit_and_fail_fast_stop_early() {
    let resource = json!({
        "resourceType": "Patient",
        "a": 1, "b": 2, "c": 3, "d": 4, "e": 5
    });

    let limited = validator_with(ValidatorConfig::builder().max_messages(2).build());
    assert_eq!(limited.validate(&resource).unwrap().messages.len(), 2);

    let fail_fast = validator_with(ValidatorConfig::builder().fail_fast(true).build());
    let outcome = fail_fast.validate(&resource).unwrap();
    assert_eq!(outcome.messages.len(), 1);
    assert!(!outcome.valid);
}

#[test]
fn config_must_match_schema_version() {
    let config = ValidatorConfig::builder()
        .fhir_version(FhirVersion::R5)
        .build();
    let err = Validator::from_config(schema_r4(), &config).err().unwrap();
    assert!(matches!(err, ConfigError::FhirVersionMismatch { .. }));
}

#[test]
fn outcome_converts_to_operation_outcome() {
    let outcome = validator()
        .validate(&json!({ "resourceType": "Bundle", "type": "test" }))
        .unwrap();
    let op = outcome.to_operation_outcome();
    assert_eq!(op["resourceType"], "OperationOutcome");
    assert_eq!(op["issue"][0]["severity"], "error");
    assert_eq!(op["issue"][0]["code"], "code-invalid");
    assert_eq!(op["issue"][0]["expression"][0], "Bundle.type");
}

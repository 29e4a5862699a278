//! End-to-end runs of the ferrite commands

use ferrite_cli::commands::{self, OutputFormat};
use ferrite_cli::AppConfig;
use ferrite_models::FhirVersion;
use ferrite_schema::Schema;
use ferrite_validator::{Preset, ValidatorConfig};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../testdata/conformance-r4.json")
}

fn config() -> AppConfig {
    AppConfig {
        definitions: vec![fixture()],
        ..AppConfig::default()
    }
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

#[test]
fn schema_requires_a_source() {
    let err = commands::load_schema(&AppConfig::default()).unwrap_err();
    assert!(err.to_string().contains("no schema"));
}

#[test]
fn build_cache_then_load_it() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("schema-r4.json");

    let built = commands::build_cache(FhirVersion::R4, &[fixture()], &cache).unwrap();
    assert!(cache.exists());

    let app = AppConfig {
        schema_cache: Some(cache.clone()),
        ..AppConfig::default()
    };
    let loaded = commands::load_schema(&app).unwrap();
    assert_eq!(loaded.version, FhirVersion::R4);
    assert_eq!(loaded.types.len(), built.types.len());
    assert!(loaded.get_resource("Patient").is_some());

    let r5 = AppConfig {
        fhir_version: FhirVersion::R5,
        ..app
    };
    assert!(commands::load_schema(&r5).is_err());
}

#[test]
fn missing_cache_falls_back_to_definitions() {
    let dir = tempfile::tempdir().unwrap();
    let app = AppConfig {
        schema_cache: Some(dir.path().join("absent.json")),
        ..config()
    };
    let schema = commands::load_schema(&app).unwrap();
    assert!(schema.get_resource("Observation").is_some());
}

#[test]
fn convert_json_to_xml_and_back() {
    let schema = commands::load_schema(&config()).unwrap();
    let patient = json!({
        "resourceType": "Patient",
        "id": "p1",
        "active": true,
        "gender": "female"
    });

    let xml = commands::convert(&schema, &patient.to_string()).unwrap();
    assert!(xml.contains("<Patient xmlns=\"http://hl7.org/fhir\">"));
    assert!(xml.contains("<gender value=\"female\"/>"));

    let back: Value = serde_json::from_str(&commands::convert(&schema, &xml).unwrap()).unwrap();
    assert_eq!(back, patient);
}

#[test]
fn validate_json_and_xml_files() {
    let dir = tempfile::tempdir().unwrap();
    let schema = Arc::new(commands::load_schema(&config()).unwrap());

    let valid = write_json(
        dir.path(),
        "patient.json",
        &json!({ "resourceType": "Patient", "id": "p1", "gender": "male" }),
    );
    let invalid = dir.path().join("bundle.xml");
    std::fs::write(
        &invalid,
        r#"<Bundle xmlns="http://hl7.org/fhir"><id value="b1"/><type value="test"/></Bundle>"#,
    )
    .unwrap();

    let outcomes = commands::validate_files(
        Arc::clone(&schema),
        &ValidatorConfig::default(),
        &[valid.clone(), invalid.clone()],
    )
    .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].0, valid);
    assert!(outcomes[0].1.valid);
    assert!(!outcomes[1].1.valid);
    assert_eq!(outcomes[1].1.messages[0].location, "Bundle.type");

    let text = commands::render_outcome(&invalid, &outcomes[1].1, OutputFormat::Text).unwrap();
    assert!(text.contains("invalid (1 errors, 0 warnings)"));
    assert!(text.contains("error Bundle.type [b1]"));

    let json: Value = serde_json::from_str(
        &commands::render_outcome(&invalid, &outcomes[1].1, OutputFormat::Json).unwrap(),
    )
    .unwrap();
    assert_eq!(json["resourceType"], "OperationOutcome");
}

#[test]
fn validate_with_a_preset() {
    let dir = tempfile::tempdir().unwrap();
    let schema = Arc::new(commands::load_schema(&config()).unwrap());
    let patient = write_json(
        dir.path(),
        "patient.json",
        &json!({ "resourceType": "Patient", "nickname": "Pete" }),
    );

    let strict =
        commands::validate_files(Arc::clone(&schema), &ValidatorConfig::default(), &[patient.clone()])
            .unwrap();
    assert!(!strict[0].1.valid);

    let lenient = commands::validate_files(
        schema,
        &ValidatorConfig::preset(Preset::Ingestion),
        &[patient],
    )
    .unwrap();
    assert!(lenient[0].1.valid);
    assert_eq!(lenient[0].1.warning_count(), 1);
}

#[test]
fn snapshot_of_a_profile_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let core = dir.path().join("core");
    std::fs::create_dir(&core).unwrap();
    std::fs::copy(fixture(), core.join("conformance-r4.json")).unwrap();

    let profiles = write_json(
        dir.path(),
        "profiles.json",
        &json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [{
                "resource": {
                    "resourceType": "StructureDefinition",
                    "id": "named-patient",
                    "url": "http://example.org/fhir/StructureDefinition/named-patient",
                    "name": "NamedPatient",
                    "kind": "resource",
                    "abstract": false,
                    "type": "Patient",
                    "baseDefinition": "http://hl7.org/fhir/StructureDefinition/Patient",
                    "derivation": "constraint",
                    "differential": {
                        "element": [{ "id": "Patient.name", "path": "Patient.name", "min": 1 }]
                    }
                }
            }]
        }),
    );

    let output: Value = serde_json::from_str(&commands::snapshot(&core, &profiles).unwrap()).unwrap();
    let sd = &output["entry"][0]["resource"];
    let elements = sd["snapshot"]["element"].as_array().unwrap();
    let name = elements
        .iter()
        .find(|e| e["path"] == "Patient.name")
        .unwrap();
    assert_eq!(name["min"], 1);
    assert!(elements.iter().any(|e| e["path"] == "Patient.gender"));
}

#[test]
fn evaluate_resolves_across_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let observation = write_json(
        dir.path(),
        "observation.json",
        &json!({
            "resourceType": "Observation",
            "status": "final",
            "subject": { "reference": "Patient/p1" }
        }),
    );
    let patient = write_json(
        dir.path(),
        "patient.json",
        &json!({ "resourceType": "Patient", "id": "p1", "gender": "female" }),
    );

    let results = commands::evaluate(
        "Observation.subject.resolve().gender",
        &[observation, patient],
    )
    .unwrap();
    assert_eq!(results, vec![vec![json!("female")], vec![]]);

    assert!(commands::evaluate("Patient.name.unknownFn()", &[]).is_err());
}

#[test]
fn binary_exit_code_follows_validity() {
    let dir = tempfile::tempdir().unwrap();
    let valid = write_json(
        dir.path(),
        "ok.json",
        &json!({ "resourceType": "Bundle", "type": "collection" }),
    );
    let invalid = write_json(
        dir.path(),
        "bad.json",
        &json!({ "resourceType": "Bundle", "type": "test" }),
    );

    let run = |input: &Path| {
        Command::new(env!("CARGO_BIN_EXE_ferrite"))
            .arg("--definitions")
            .arg(fixture())
            .arg("validate")
            .arg(input)
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    };

    let ok = run(&valid);
    assert!(ok.status.success());
    assert!(String::from_utf8_lossy(&ok.stdout).contains("valid (0 errors"));

    let bad = run(&invalid);
    assert!(!bad.status.success());
    assert!(String::from_utf8_lossy(&bad.stdout).contains("Bundle.type"));
}

#[test]
fn cached_schema_round_trips_through_serde() {
    let schema = commands::load_schema(&config()).unwrap();
    let restored = Schema::from_cache_json(&schema.to_cache_json().unwrap()).unwrap();
    assert_eq!(restored.types.len(), schema.types.len());
}

//! Splicing differentials into base snapshots

use ferrite_snapshot::{generate_snapshot, Differential, ElementDefinition, Snapshot};
use serde_json::json;

fn make_element(path: &str, min: Option<u32>, max: Option<&str>) -> ElementDefinition {
    ElementDefinition {
        min,
        max: max.map(str::to_string),
        ..ElementDefinition::new(path)
    }
}

#[test]
fn test_differential_min_keeps_base_max_and_type() {
    let mut base_name = make_element("Patient.name", Some(0), Some("*"));
    base_name.types = Some(serde_json::from_value(json!([{ "code": "HumanName" }])).unwrap());
    let base = Snapshot {
        element: vec![make_element("Patient", None, None), base_name],
    };
    let differential = Differential {
        element: vec![ElementDefinition {
            min: Some(1),
            ..ElementDefinition::new("Patient.name")
        }],
    };

    let merged = generate_snapshot(&base, &differential).unwrap();

    assert_eq!(merged.element.len(), 2);
    let name = merged.get_element("Patient.name").unwrap();
    assert_eq!(name.min, Some(1));
    assert_eq!(name.max.as_deref(), Some("*"));
    assert_eq!(name.type_codes(), vec!["HumanName"]);
}

#[test]
fn test_new_element_is_added_after_its_parent_subtree() {
    let base = Snapshot {
        element: vec![
            make_element("Patient", None, None),
            make_element("Patient.name", Some(0), Some("*")),
        ],
    };
    let differential = Differential {
        element: vec![make_element("Patient.birthDate", Some(0), Some("1"))],
    };

    let merged = generate_snapshot(&base, &differential).unwrap();

    let paths: Vec<_> = merged.element.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["Patient", "Patient.name", "Patient.birthDate"]);
}

#[test]
fn test_parent_and_child_replace_whole_subtree() {
    let base = Snapshot {
        element: vec![
            make_element("Questionnaire", None, None),
            make_element("Questionnaire.url", Some(0), Some("1")),
            make_element("Questionnaire.item", Some(0), Some("*")),
            make_element("Questionnaire.item.linkId", Some(1), Some("1")),
            make_element("Questionnaire.item.text", Some(0), Some("1")),
            make_element("Questionnaire.item.type", Some(1), Some("1")),
            make_element("Questionnaire.status", Some(1), Some("1")),
        ],
    };
    let differential = Differential {
        element: vec![
            make_element("Questionnaire.item", Some(1), None),
            make_element("Questionnaire.item.type", None, None),
            make_element("Questionnaire.item.text", Some(1), None),
        ],
    };

    let merged = generate_snapshot(&base, &differential).unwrap();

    let paths: Vec<_> = merged.element.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "Questionnaire",
            "Questionnaire.url",
            "Questionnaire.item",
            "Questionnaire.item.type",
            "Questionnaire.item.text",
            "Questionnaire.status",
        ]
    );
    let item = &merged.element[2];
    assert_eq!((item.min, item.max.as_deref()), (Some(1), Some("*")));
    let ty = &merged.element[3];
    assert_eq!((ty.min, ty.max.as_deref()), (Some(1), Some("1")));
    let text = &merged.element[4];
    assert_eq!((text.min, text.max.as_deref()), (Some(1), Some("1")));
}

#[test]
fn test_untouched_siblings_survive() {
    let base = Snapshot {
        element: vec![
            make_element("Observation", None, None),
            make_element("Observation.status", Some(1), Some("1")),
            make_element("Observation.code", Some(1), Some("1")),
            make_element("Observation.component", Some(0), Some("*")),
            make_element("Observation.component.code", Some(1), Some("1")),
        ],
    };
    let differential = Differential {
        element: vec![make_element("Observation.code", None, None)],
    };

    let merged = generate_snapshot(&base, &differential).unwrap();
    assert_eq!(merged.element.len(), base.element.len());
    for (out, original) in merged.element.iter().zip(&base.element) {
        assert_eq!(out.path, original.path);
        assert_eq!(out.min, original.min);
    }
}

#[test]
fn test_fixed_value_family_replaced_family_wide() {
    let base = Snapshot {
        element: serde_json::from_value(json!([
            { "path": "Observation" },
            { "path": "Observation.code", "min": 1, "max": "1",
              "patternCoding": { "system": "http://loinc.org" } }
        ]))
        .unwrap(),
    };
    let differential = Differential {
        element: serde_json::from_value(json!([
            { "path": "Observation.code",
              "patternCodeableConcept": { "coding": [{ "system": "http://loinc.org", "code": "8867-4" }] } }
        ]))
        .unwrap(),
    };

    let merged = generate_snapshot(&base, &differential).unwrap();
    let code = serde_json::to_value(&merged.element[1]).unwrap();
    assert!(code.get("patternCoding").is_none());
    assert_eq!(code["patternCodeableConcept"]["coding"][0]["code"], "8867-4");
}

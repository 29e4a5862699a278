mod test_support;

use ferrite_format::{json_to_xml, resource_to_xml, xml_to_json, xml_to_resource, FormatError};
use serde_json::{json, Value};
use test_support::schema_r4;

fn patient() -> Value {
    json!({
        "resourceType": "Patient",
        "id": "p1",
        "meta": { "lastUpdated": "2024-01-02T10:00:00Z" },
        "text": {
            "status": "generated",
            "div": "<div xmlns=\"http://www.w3.org/1999/xhtml\"><p>Peter James</p></div>"
        },
        "contained": [
            { "resourceType": "Organization", "id": "org1", "name": "ACME" }
        ],
        "extension": [
            { "url": "http://example.org/nickname", "valueString": "PJ" }
        ],
        "active": true,
        "name": [{
            "id": "n1",
            "family": "Chalmers",
            "given": ["Peter", "James"],
            "_given": [null, {
                "extension": [{ "url": "http://example.org/preferred", "valueBoolean": true }]
            }]
        }],
        "gender": "male",
        "birthDate": "1974-12-25",
        "_birthDate": { "id": "bd" },
        "deceasedBoolean": false,
        "managingOrganization": { "reference": "#org1" }
    })
}

#[test]
fn patient_xml_layout() {
    let schema = schema_r4();
    let xml = resource_to_xml(&schema, &patient()).unwrap();

    assert!(xml.starts_with("<Patient xmlns=\"http://hl7.org/fhir\">"));
    assert!(xml.contains("<id value=\"p1\"/>"));
    assert!(xml.contains("<name id=\"n1\">"));
    assert!(xml.contains("<given value=\"Peter\"/>"));
    assert!(xml.contains("<extension url=\"http://example.org/preferred\">"));
    assert!(xml.contains("<valueBoolean value=\"true\"/>"));
    assert!(xml.contains("<birthDate id=\"bd\" value=\"1974-12-25\"/>"));
    assert!(xml.contains("<deceasedBoolean value=\"false\"/>"));
    assert!(xml.contains("<Organization>"));
    assert!(xml.contains("<id value=\"org1\"/>"));
    assert!(xml.contains("<div xmlns=\"http://www.w3.org/1999/xhtml\"><p>Peter James</p></div>"));

    // Schema order, not input order; the contained Organization has its own <name>
    let active = xml.find("<active").unwrap();
    let name = xml.find("<name id=\"n1\"").unwrap();
    let gender = xml.find("<gender").unwrap();
    assert!(active < name && name < gender);
}

#[test]
fn patient_round_trip() {
    let schema = schema_r4();
    let original = patient();
    let xml = resource_to_xml(&schema, &original).unwrap();
    let back = xml_to_resource(&schema, &xml).unwrap();
    assert_eq!(back, original);
}

#[test]
fn empty_nested_item_array_is_not_written() {
    let schema = schema_r4();
    let questionnaire = json!({
        "resourceType": "Questionnaire",
        "status": "draft",
        "item": [{ "linkId": "1", "type": "group", "item": [] }]
    });

    let xml = resource_to_xml(&schema, &questionnaire).unwrap();
    assert_eq!(xml.matches("<item").count(), 1);
    assert!(xml.contains("<linkId value=\"1\"/>"));
}

#[test]
fn nested_items_follow_the_local_reference() {
    let schema = schema_r4();
    let questionnaire = json!({
        "resourceType": "Questionnaire",
        "item": [{
            "linkId": "1",
            "type": "group",
            "item": [
                { "linkId": "1.1", "type": "boolean", "required": true },
                { "linkId": "1.2", "type": "string" }
            ]
        }]
    });

    let xml = resource_to_xml(&schema, &questionnaire).unwrap();
    assert_eq!(xml.matches("<item>").count(), 3);
    assert!(xml.contains("<required value=\"true\"/>"));
    assert_eq!(xml_to_resource(&schema, &xml).unwrap(), questionnaire);
}

#[test]
fn decimal_precision_survives_xml_to_json() {
    let schema = schema_r4();
    let xml = r#"<Observation xmlns="http://hl7.org/fhir">
  <status value="final"/>
  <code><text value="Weight"/></code>
  <valueQuantity>
    <value value="25.0"/>
    <unit value="kg"/>
  </valueQuantity>
</Observation>"#;

    let json = xml_to_json(&schema, xml).unwrap();
    assert!(json.contains("\"value\": 25.0"), "{}", json);
    let parsed: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["valueQuantity"]["unit"], "kg");

    let again = json_to_xml(&schema, &json).unwrap();
    assert!(again.contains("<value value=\"25.0\"/>"));
}

#[test]
fn integer_form_decimals_beyond_u64_keep_every_digit() {
    let schema = schema_r4();
    let json = r#"{"resourceType":"Observation","status":"final","code":{"text":"Count"},"valueQuantity":{"value":1234567890123456789012345678}}"#;

    let xml = json_to_xml(&schema, json).unwrap();
    assert!(
        xml.contains("<value value=\"1234567890123456789012345678\"/>"),
        "{}",
        xml
    );

    let back = xml_to_json(&schema, &xml).unwrap();
    assert!(back.contains("\"value\": 1234567890123456789012345678"), "{}", back);
    assert_eq!(json_to_xml(&schema, &back).unwrap(), xml);
}

#[test]
fn in_memory_decimals_are_exact_strings() {
    let schema = schema_r4();
    let xml = r#"<Observation xmlns="http://hl7.org/fhir">
  <status value="final"/>
  <code><text value="Ratio"/></code>
  <valueQuantity><value value="3.14159265358979323846"/></valueQuantity>
</Observation>"#;

    let resource = xml_to_resource(&schema, xml).unwrap();
    assert_eq!(resource["valueQuantity"]["value"], "3.14159265358979323846");
    let written = resource_to_xml(&schema, &resource).unwrap();
    assert!(written.contains("value=\"3.14159265358979323846\""));
}

#[test]
fn integers_are_native_numbers() {
    let schema = schema_r4();
    let xml = r#"<Bundle xmlns="http://hl7.org/fhir">
  <type value="searchset"/>
  <total value="2"/>
  <entry>
    <fullUrl value="http://example.org/Patient/1"/>
    <resource>
      <Patient><id value="1"/><active value="false"/></Patient>
    </resource>
  </entry>
</Bundle>"#;

    let bundle = xml_to_resource(&schema, xml).unwrap();
    assert_eq!(bundle["total"], 2);
    assert_eq!(bundle["entry"][0]["resource"]["resourceType"], "Patient");
    assert_eq!(bundle["entry"][0]["resource"]["id"], "1");
    assert_eq!(bundle["entry"][0]["resource"]["active"], false);
}

#[test]
fn malformed_primitives_are_fatal() {
    let schema = schema_r4();

    let err = xml_to_resource(
        &schema,
        r#"<Patient xmlns="http://hl7.org/fhir"><active value="yes"/></Patient>"#,
    )
    .unwrap_err();
    assert!(matches!(err, FormatError::InvalidBoolean { .. }));

    let err = xml_to_resource(
        &schema,
        r#"<Bundle xmlns="http://hl7.org/fhir"><type value="batch"/><total value="1.5"/></Bundle>"#,
    )
    .unwrap_err();
    assert!(matches!(err, FormatError::InvalidInteger { .. }));

    let err = xml_to_resource(
        &schema,
        r#"<Observation xmlns="http://hl7.org/fhir"><valueQuantity><value value="1,5"/></valueQuantity></Observation>"#,
    )
    .unwrap_err();
    assert!(matches!(err, FormatError::InvalidDecimal { .. }));
}

#[test]
fn unknown_resource_type_is_fatal() {
    let schema = schema_r4();
    let err = xml_to_resource(&schema, r#"<Foo xmlns="http://hl7.org/fhir"/>"#).unwrap_err();
    assert!(matches!(err, FormatError::UnknownResourceType(ref name) if name == "Foo"));

    let err = json_to_xml(&schema, r#"{"resourceType": "Foo"}"#).unwrap_err();
    assert!(matches!(err, FormatError::UnknownResourceType(_)));

    let err = json_to_xml(&schema, r#"{"active": true}"#).unwrap_err();
    assert!(matches!(err, FormatError::MissingResourceType));
}

#[test]
fn attribute_values_are_escaped() {
    let schema = schema_r4();
    let resource = json!({
        "resourceType": "Organization",
        "name": "Smith & \"Sons\"\nLtd"
    });

    let xml = resource_to_xml(&schema, &resource).unwrap();
    assert!(xml.contains("<name value=\"Smith &amp; &quot;Sons&quot;&#xA;Ltd\"/>"));
    assert_eq!(xml_to_resource(&schema, &xml).unwrap(), resource);
}

#[test]
fn empty_elements_are_suppressed() {
    let schema = schema_r4();
    let resource = json!({
        "resourceType": "Patient",
        "name": [{}],
        "maritalStatus": { "coding": [] }
    });

    let xml = resource_to_xml(&schema, &resource).unwrap();
    assert!(!xml.contains("<name"));
    assert!(!xml.contains("<maritalStatus"));
}

#[test]
fn narrative_markup_is_checked_and_namespaced() {
    let schema = schema_r4();
    let resource = json!({
        "resourceType": "Organization",
        "text": { "status": "generated", "div": "<div><p>Fish & chips</p></div>" }
    });
    let xml = resource_to_xml(&schema, &resource).unwrap();
    assert!(xml.contains(
        "<div xmlns=\"http://www.w3.org/1999/xhtml\"><p>Fish &amp; chips</p></div>"
    ));

    let broken = json!({
        "resourceType": "Organization",
        "text": { "status": "generated", "div": "<div><p>open</div>" }
    });
    let err = resource_to_xml(&schema, &broken).unwrap_err();
    assert!(matches!(err, FormatError::InvalidXhtml(_)));
}

#[test]
fn array_for_single_property_is_rejected() {
    let schema = schema_r4();
    let err = resource_to_xml(
        &schema,
        &json!({ "resourceType": "Patient", "active": [true] }),
    )
    .unwrap_err();
    assert!(matches!(err, FormatError::ShapeMismatch { .. }));
}

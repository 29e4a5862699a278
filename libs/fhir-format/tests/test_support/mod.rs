#![allow(dead_code)]

use ferrite_models::{Bundle, FhirVersion};
use ferrite_schema::{ConformanceParser, Schema};
use serde_json::Value;
use std::sync::{Arc, OnceLock};

const CONFORMANCE_R4: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../testdata/conformance-r4.json"
));

pub fn conformance_bundle() -> Bundle {
    let value: Value = serde_json::from_str(CONFORMANCE_R4).expect("fixture is valid JSON");
    Bundle::from_value(&value).expect("fixture is a Bundle")
}

static SCHEMA_R4: OnceLock<Arc<Schema>> = OnceLock::new();

pub fn schema_r4() -> Arc<Schema> {
    SCHEMA_R4
        .get_or_init(|| {
            let mut parser = ConformanceParser::new(FhirVersion::R4);
            parser
                .parse_bundle(&conformance_bundle())
                .expect("Failed to parse R4 conformance fixture");
            Arc::new(parser.into_schema())
        })
        .clone()
}

//! FHIR property-tree schema
//!
//! Turns conformance resources (StructureDefinition snapshots, ValueSets,
//! CodeSystems) into a [`Schema`]: per type, an ordered list of [`Property`]
//! nodes carrying name, type, cardinality, choice group and binding. The
//! [`walker`] module drives a single recursive traversal over that model for
//! conversion and validation.
//!
//! # Example
//!
//! ```rust
//! use ferrite_models::{FhirVersion, StructureDefinition};
//! use ferrite_schema::ConformanceParser;
//! use serde_json::json;
//!
//! let sd = StructureDefinition::from_value(&json!({
//!     "resourceType": "StructureDefinition",
//!     "id": "Basic",
//!     "kind": "resource",
//!     "type": "Basic",
//!     "snapshot": { "element": [
//!         { "id": "Basic", "path": "Basic", "min": 0, "max": "*" },
//!         { "id": "Basic.code", "path": "Basic.code", "min": 1, "max": "1",
//!           "type": [{ "code": "CodeableConcept" }] }
//!     ]}
//! }))
//! .unwrap();
//!
//! let mut parser = ConformanceParser::new(FhirVersion::R4);
//! let def = parser.parse_structure_definition(&sd).unwrap();
//! assert_eq!(def.properties[0].type_code(), "CodeableConcept");
//! assert!(def.properties[0].required);
//! ```

pub mod cache;
pub mod error;
pub mod parser;
pub mod primitives;
pub mod property;
pub mod schema;
pub mod value_set;
pub mod walker;

pub use error::{Result, SchemaError};
pub use parser::{ConformanceParser, ParserConfig};
pub use primitives::PrimitiveType;
pub use property::{Property, PropertyType, SHADOW_CHILDREN};
pub use schema::{CodeSystemCodes, Concept, Schema, TypeDefinition, ValueSetCodes};
pub use walker::{Cardinality, Occurrence, PropertyVisitor, Walker};

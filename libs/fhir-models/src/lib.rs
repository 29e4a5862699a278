//! FHIR conformance models
//!
//! This crate provides strongly-typed Rust structures for the conformance
//! resources the rest of the workspace consumes: StructureDefinition,
//! ElementDefinition, ValueSet, CodeSystem and Bundle.
//!
//! # Module Organization
//!
//! - `common`: Version-agnostic models that work across FHIR STU3, R4 and R5
//!
//! # Design Philosophy
//!
//! - **Version-agnostic core**: Common fields present across all FHIR versions
//! - **Lossless**: unknown properties are captured in `extensions` and written back
//! - **Typed polymorphism**: `fixed[x]`, `pattern[x]`, `defaultValue[x]`,
//!   `minValue[x]` and `maxValue[x]` are lifted into [`PolymorphicField`]s so a
//!   family can only ever hold one typed key
//!
//! # Example
//!
//! ```rust
//! use ferrite_models::common::{StructureDefinition, StructureDefinitionKind};
//! use serde_json::json;
//!
//! let sd_json = json!({
//!     "resourceType": "StructureDefinition",
//!     "id": "Patient",
//!     "url": "http://hl7.org/fhir/StructureDefinition/Patient",
//!     "name": "Patient",
//!     "kind": "resource",
//!     "type": "Patient"
//! });
//!
//! let sd: StructureDefinition = serde_json::from_value(sd_json).unwrap();
//! assert_eq!(sd.name.as_deref(), Some("Patient"));
//! assert_eq!(sd.kind, StructureDefinitionKind::Resource);
//! ```

pub mod common;

// Re-export commonly used types
pub use common::*;

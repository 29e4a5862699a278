//! FHIR Context for runtime conformance resource access
//!
//! Provides a trait-based interface for looking up StructureDefinitions and
//! other canonical resources, plus an in-memory store that can be filled from
//! bundles or a directory of JSON files.

pub mod context;
pub mod error;

pub use context::{DefaultFhirContext, FhirContext};
pub use error::{Error, Result};

//! Version-agnostic FHIR models
//!
//! Types that work across FHIR STU3, R4 and R5

pub mod bundle;
pub mod code_system;
pub mod complex;
pub mod element_definition;
pub mod error;
pub mod structure_definition;
pub mod value_set;
pub mod version;

// Re-export commonly used types
pub use bundle::*;
pub use code_system::*;
pub use complex::*;
pub use element_definition::*;
pub use error::{Error, Result};
pub use structure_definition::*;
pub use value_set::*;
pub use version::FhirVersion;

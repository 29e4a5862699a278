//! FHIR StructureDefinition Snapshot Generation
//!
//! Computes `snapshot.element[]` for profiles that only carry a differential,
//! by splicing the differential into the snapshot of the base definition.
//!
//! # Example
//!
//! ```rust,no_run
//! use ferrite_context::DefaultFhirContext;
//! use ferrite_models::Bundle;
//! use ferrite_snapshot::SnapshotGenerator;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let core = DefaultFhirContext::from_dir("definitions/r4")?;
//! # let profiles = Bundle::collection();
//! let mut generator = SnapshotGenerator::new(&core, &profiles)?;
//! generator.generate()?;
//! let with_snapshots = generator.into_bundle()?;
//! # let _ = with_snapshots;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod merge;
pub mod normalization;
pub mod pattern;

pub use error::{Error, Result};
pub use generator::{generate_snapshot, SnapshotGenerator};
pub use merge::merge_element;
pub use pattern::PathPattern;
pub use ferrite_models::{Differential, ElementDefinition, Snapshot, StructureDefinition};

//! FHIR resource validation
//!
//! Validates JSON resources against a [`ferrite_schema::Schema`]: required
//! properties and choice groups, array shape, primitive lexical forms,
//! value-set bindings, reference target types and unknown properties. Each
//! finding is a [`ValidatorMessage`] carrying the dotted path of the
//! offending element and the id of the resource it belongs to.
//!
//! # Example
//!
//! ```rust,no_run
//! use ferrite_schema::Schema;
//! use ferrite_validator::{Preset, Validator, ValidatorConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(Schema::load_cache("schema-r4.json")?);
//! let config = ValidatorConfig::preset(Preset::Server);
//! let validator = Validator::from_config(schema, &config)?;
//!
//! let outcome = validator.validate(&json!({
//!     "resourceType": "Bundle",
//!     "type": "collection"
//! }))?;
//! assert!(outcome.valid);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod message;
mod plan;
mod session;
mod validator;

pub use config::{
    ExecConfig, ExtensibleHandling, FhirConfig, Preset, ReferenceMode, ReferencesConfig,
    SchemaConfig, TerminologyConfig, TerminologyMode, UnknownPropertyMode, ValidatorConfig,
    ValidatorConfigBuilder,
};
pub use error::{ConfigError, Result, ValidatorError};
pub use ferrite_models::FhirVersion;
pub use message::{IssueCode, Severity, ValidationOutcome, ValidatorMessage, INITIAL_RESOURCE_ID};
pub use plan::{ReferencesPlan, StructurePlan, TerminologyPlan, ValidationPlan};
pub use validator::Validator;

//! Error types for snapshot generation

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("StructureDefinition '{0}' has no differential elements")]
    MissingDifferential(String),

    #[error("StructureDefinition '{0}' has no baseDefinition")]
    MissingBaseDefinition(String),

    #[error("Base definition '{base}' of '{url}' not found")]
    BaseNotFound { url: String, base: String },

    #[error("Core definitions are not loaded (required by base '{0}')")]
    CoreDefinitionsNotLoaded(String),

    #[error("Base definition '{0}' has no snapshot")]
    MissingBaseSnapshot(String),

    #[error("Circular baseDefinition chain at '{0}'")]
    CircularBase(String),

    #[error("StructureDefinition '{0}' is not part of this generation run")]
    UnknownDefinition(String),

    #[error("Invalid element path pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("FHIR context error: {0}")]
    FhirContext(#[from] ferrite_context::Error),

    #[error("Model error: {0}")]
    Model(#[from] ferrite_models::Error),
}

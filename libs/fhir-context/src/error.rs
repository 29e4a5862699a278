//! Error types for FHIR context

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid StructureDefinition: {0}")]
    InvalidStructureDefinition(String),

    #[error("Resource has no canonical url: {0}")]
    MissingCanonicalUrl(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    Model(#[from] ferrite_models::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

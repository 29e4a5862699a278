//! Error types for FHIR models

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unexpected resource type: {0}")]
    UnexpectedResourceType(String),

    #[error("Unknown FHIR version '{0}'")]
    UnknownVersion(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

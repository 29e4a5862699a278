use thiserror::Error;

/// Input the validator cannot work with at all.
///
/// Data-quality problems are never errors; they are reported as
/// [`crate::ValidatorMessage`]s.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("expected a JSON object for the resource")]
    NotAnObject,

    #[error("missing resourceType property")]
    MissingResourceType,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("FHIR version mismatch: expected {expected:?}, got {got:?}")]
    FhirVersionMismatch {
        expected: crate::FhirVersion,
        got: crate::FhirVersion,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;

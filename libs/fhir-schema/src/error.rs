//! Error types for schema construction and lookup

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("StructureDefinition has neither id nor url (name: {0})")]
    MissingIdentity(String),

    #[error("StructureDefinition '{0}' has no snapshot elements")]
    MissingSnapshot(String),

    #[error("Element '{0}' does not declare a max cardinality")]
    MissingMax(String),

    #[error("Element '{element}' has no parent element '{parent}'")]
    MissingParent { element: String, parent: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Unresolvable local reference: {0}")]
    UnresolvedLocalReference(String),

    #[error("Schema cache error: {0}")]
    Cache(String),

    #[error("Model error: {0}")]
    Model(#[from] ferrite_models::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;

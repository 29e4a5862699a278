//! Error types for path expression parsing and evaluation

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    /// Raised by a [`crate::ResourceResolver`] that failed to look a reference up
    #[error("Evaluation error: {0}")]
    EvaluationError(String),
}

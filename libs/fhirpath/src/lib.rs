//! Path expressions over FHIR resources
//!
//! A small FHIRPath subset for reading values out of JSON resources: dotted
//! paths, `first()`, `last()`, `where()`, `exists()`, `startsWith()`,
//! `resolve()`, `=`/`!=`, `and`/`or`, and string, number and boolean
//! literals.
//!
//! ```text
//! Expression String
//!      |
//!   Lexer -> Tokens
//!      |
//!   Parser -> AST
//!      |
//!   Engine -> Collection
//! ```
//!
//! # Example
//!
//! ```rust
//! use ferrite_fhirpath::Engine;
//! use serde_json::json;
//!
//! let patient = json!({
//!     "resourceType": "Patient",
//!     "name": [{ "use": "official", "given": ["Peter", "James"] }]
//! });
//!
//! let engine = Engine::new();
//! let given = engine
//!     .evaluate_expr("Patient.name.where(use = 'official').given.first()", &patient)
//!     .unwrap();
//! assert_eq!(given, vec![json!("Peter")]);
//! ```

pub mod ast;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod token;

pub use engine::{Collection, Engine, Expression};
pub use error::{Error, Result};
pub use parser::parse;
pub use resolver::{resolve_local, ResourceResolver};

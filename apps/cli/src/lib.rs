//! ferrite command-line interface
//!
//! Commands for converting, validating and profiling FHIR resources against a
//! schema built from conformance bundles or loaded from a schema cache.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

pub use cli::{run, Cli, Command};
pub use config::{AppConfig, LoggingConfig};

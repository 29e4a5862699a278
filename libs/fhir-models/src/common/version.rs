//! FHIR release identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::Error;

/// FHIR release a schema or a conformance package belongs to.
///
/// The release decides a few source-format details, most notably how an
/// ElementDefinition binding names its value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FhirVersion {
    #[serde(rename = "STU3", alias = "Stu3", alias = "stu3", alias = "3.0.2", alias = "3.0.1")]
    Stu3,
    #[default]
    #[serde(alias = "r4", alias = "4.0.1", alias = "4.0.0")]
    R4,
    #[serde(alias = "r5", alias = "5.0.0")]
    R5,
}

impl FhirVersion {
    /// Version label as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stu3 => "STU3",
            Self::R4 => "R4",
            Self::R5 => "R5",
        }
    }

    /// Whether bindings reference their value set via `valueSetReference`/`valueSetUri`.
    pub fn uses_value_set_reference(&self) -> bool {
        matches!(self, Self::Stu3)
    }
}

impl fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FhirVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "STU3" | "stu3" | "Stu3" | "R3" | "r3" => Ok(Self::Stu3),
            "R4" | "r4" => Ok(Self::R4),
            "R5" | "r5" => Ok(Self::R5),
            other if other.starts_with("3.") => Ok(Self::Stu3),
            other if other.starts_with("4.") => Ok(Self::R4),
            other if other.starts_with("5.") => Ok(Self::R5),
            other => Err(Error::UnknownVersion(other.to_string())),
        }
    }
}

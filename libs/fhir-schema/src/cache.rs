//! Persisted schema cache
//!
//! A parsed [`Schema`] can be written to a JSON envelope and loaded back
//! without re-parsing conformance bundles. Loading yields a value equal to
//! the one that was saved.

use crate::error::{Result, SchemaError};
use crate::schema::{Schema, TypeDefinition, ValueSetCodes};
use ferrite_models::FhirVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Bumped whenever the cached property-tree shape changes
pub const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEnvelope {
    format_version: u32,
    fhir_version: FhirVersion,
    types: BTreeMap<String, TypeDefinition>,
    value_sets: BTreeMap<String, ValueSetCodes>,
}

impl Schema {
    /// Serialize to the cache envelope. Keys are sorted so output is stable.
    pub fn to_cache_json(&self) -> Result<String> {
        let envelope = CacheEnvelope {
            format_version: CACHE_FORMAT_VERSION,
            fhir_version: self.version,
            types: self.types.clone().into_iter().collect(),
            value_sets: self.value_sets.clone().into_iter().collect(),
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    pub fn from_cache_json(text: &str) -> Result<Self> {
        let envelope: CacheEnvelope = serde_json::from_str(text)?;
        if envelope.format_version != CACHE_FORMAT_VERSION {
            return Err(SchemaError::Cache(format!(
                "unsupported cache format version {} (expected {})",
                envelope.format_version, CACHE_FORMAT_VERSION
            )));
        }
        Ok(Schema {
            version: envelope.fhir_version,
            types: envelope.types.into_iter().collect(),
            value_sets: envelope.value_sets.into_iter().collect(),
        })
    }

    pub fn save_cache(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_cache_json()?)?;
        tracing::info!(
            path = %path.display(),
            types = self.types.len(),
            value_sets = self.value_sets.len(),
            "schema cache written"
        );
        Ok(())
    }

    pub fn load_cache(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let schema = Self::from_cache_json(&text)?;
        tracing::debug!(
            path = %path.display(),
            version = %schema.version,
            "schema cache loaded"
        );
        Ok(schema)
    }
}

use crate::error::{Error, Result};
use ferrite_models::{Bundle, StructureDefinition, CORE_DEFINITION_PREFIX};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Read access to conformance resources keyed by canonical URL.
///
/// Only [`FhirContext::get_resource_by_url`] is required; typed accessors are
/// derived from it.
pub trait FhirContext: Send + Sync {
    /// Raw resource for a canonical URL, optionally pinned to a business version.
    fn get_resource_by_url(
        &self,
        canonical_url: &str,
        version: Option<&str>,
    ) -> Result<Option<Arc<Value>>>;

    /// Typed StructureDefinition for a canonical URL.
    fn get_structure_definition(
        &self,
        canonical_url: &str,
    ) -> Result<Option<Arc<StructureDefinition>>> {
        let Some(value) = self.get_resource_by_url(canonical_url, None)? else {
            return Ok(None);
        };
        if value.get("resourceType").and_then(Value::as_str) != Some("StructureDefinition") {
            return Ok(None);
        }
        let sd = StructureDefinition::from_value(&value)
            .map_err(|e| Error::InvalidStructureDefinition(format!("{}: {}", canonical_url, e)))?;
        Ok(Some(Arc::new(sd)))
    }

    /// Core definition of a type name, e.g. `Patient`.
    fn get_core_structure_definition_by_type(
        &self,
        type_name: &str,
    ) -> Result<Option<Arc<StructureDefinition>>> {
        self.get_structure_definition(&format!("{}{}", CORE_DEFINITION_PREFIX, type_name))
    }

    /// Whether any core definitions are available.
    fn has_core_definitions(&self) -> bool {
        true
    }
}

/// In-memory conformance store.
///
/// Resources are indexed by `url` and by `url|version`. Parsed
/// StructureDefinitions are memoized.
#[derive(Default)]
pub struct DefaultFhirContext {
    resources: HashMap<String, Arc<Value>>,
    parsed: RwLock<HashMap<String, Arc<StructureDefinition>>>,
}

impl DefaultFhirContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding every resource of a bundle that carries a `url`.
    pub fn from_bundle(bundle: &Bundle) -> Self {
        let mut ctx = Self::new();
        ctx.add_bundle(bundle);
        ctx
    }

    /// Load all `*.json` files of a directory (single resources or bundles).
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut ctx = Self::new();
        ctx.load_dir(dir)?;
        Ok(ctx)
    }

    /// Register a single resource under its canonical URL.
    pub fn add_resource(&mut self, resource: Value) -> Result<()> {
        let url = resource
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::MissingCanonicalUrl(
                    resource
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or("<no id>")
                        .to_string(),
                )
            })?
            .to_string();
        let version = resource
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string);

        let resource = Arc::new(resource);
        if let Some(version) = version {
            self.resources
                .insert(format!("{}|{}", url, version), Arc::clone(&resource));
        }
        self.resources.insert(url, resource);
        if let Ok(mut parsed) = self.parsed.write() {
            parsed.clear();
        }
        Ok(())
    }

    /// Register every bundle entry that has a canonical URL; others are skipped.
    pub fn add_bundle(&mut self, bundle: &Bundle) -> usize {
        let mut added = 0;
        for entry in bundle.entries() {
            let Some(resource) = entry.resource.as_ref() else {
                continue;
            };
            match self.add_resource(resource.clone()) {
                Ok(()) => added += 1,
                Err(e) => tracing::debug!("skipping bundle entry: {}", e),
            }
        }
        added
    }

    /// Load all `*.json` files of a directory. Returns the number of resources added.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut added = 0;
        for path in paths {
            let text = std::fs::read_to_string(&path)?;
            let value: Value = serde_json::from_str(&text)?;
            if value.get("resourceType").and_then(Value::as_str) == Some("Bundle") {
                added += self.add_bundle(&Bundle::from_value(&value)?);
            } else if let Err(e) = self.add_resource(value) {
                tracing::debug!("skipping {}: {}", path.display(), e);
            } else {
                added += 1;
            }
        }

        tracing::info!(
            "loaded {} conformance resources from {}",
            added,
            dir.display()
        );
        Ok(added)
    }

    /// Number of distinct canonical keys in the store
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl FhirContext for DefaultFhirContext {
    fn get_resource_by_url(
        &self,
        canonical_url: &str,
        version: Option<&str>,
    ) -> Result<Option<Arc<Value>>> {
        let key = match version {
            Some(v) => format!("{}|{}", canonical_url, v),
            None => canonical_url.to_string(),
        };
        Ok(self.resources.get(&key).cloned())
    }

    fn get_structure_definition(
        &self,
        canonical_url: &str,
    ) -> Result<Option<Arc<StructureDefinition>>> {
        if let Ok(parsed) = self.parsed.read() {
            if let Some(sd) = parsed.get(canonical_url) {
                return Ok(Some(Arc::clone(sd)));
            }
        }

        let Some(value) = self.resources.get(canonical_url) else {
            return Ok(None);
        };
        if value.get("resourceType").and_then(Value::as_str) != Some("StructureDefinition") {
            return Ok(None);
        }
        let sd = Arc::new(
            StructureDefinition::from_value(value).map_err(|e| {
                Error::InvalidStructureDefinition(format!("{}: {}", canonical_url, e))
            })?,
        );
        if let Ok(mut parsed) = self.parsed.write() {
            parsed.insert(canonical_url.to_string(), Arc::clone(&sd));
        }
        Ok(Some(sd))
    }

    fn has_core_definitions(&self) -> bool {
        self.resources
            .keys()
            .any(|url| url.starts_with(CORE_DEFINITION_PREFIX))
    }
}

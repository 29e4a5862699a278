//! Snapshot generation from differentials
//!
//! [`generate_snapshot`] splices one differential into a base snapshot.
//! [`SnapshotGenerator`] runs it over every StructureDefinition of a bundle,
//! resolving base definitions from core definitions or, depth first, from the
//! bundle itself.

use crate::error::{Error, Result};
use crate::merge::merge_element;
use crate::normalization::{normalize_differential, normalize_snapshot};
use crate::pattern::PathPattern;
use ferrite_context::FhirContext;
use ferrite_models::{
    Bundle, Differential, ElementDefinition, Snapshot, StructureDefinition,
    CORE_DEFINITION_PREFIX,
};
use std::collections::{HashMap, HashSet};

/// Splice `differential` into a copy of `base`.
///
/// A base element is a splice point when a differential path names it. The
/// splice point and its base descendants are replaced by every differential
/// element at or beneath it, in differential order, each merged onto the base
/// element with the same path when there is one. Differential elements with
/// no base counterpart anywhere are inserted after the subtree of their
/// nearest ancestor.
pub fn generate_snapshot(base: &Snapshot, differential: &Differential) -> Result<Snapshot> {
    let base_elements = &base.element;
    let diff = &differential.element;
    let Some(base_root) = base_elements.first() else {
        let mut snapshot = Snapshot {
            element: diff.clone(),
        };
        normalize_snapshot(&mut snapshot);
        return Ok(snapshot);
    };

    let mut consumed = vec![false; diff.len()];
    let mut elements: Vec<ElementDefinition> = Vec::with_capacity(base_elements.len() + diff.len());

    let mut root = base_root.clone();
    for (i, element) in diff.iter().enumerate() {
        if element.path == base_root.path {
            root = merge_element(element, &root);
            consumed[i] = true;
        }
    }
    elements.push(root);

    let mut replaced: Option<&str> = None;
    for element in &base_elements[1..] {
        if let Some(prefix) = replaced {
            if element.is_descendant_of(prefix) {
                continue;
            }
            replaced = None;
        }

        let pattern = PathPattern::new(&element.path)?;
        if !diff.iter().any(|d| pattern.matches(&d.path)) {
            elements.push(element.clone());
            continue;
        }

        let before = elements.len();
        for (i, candidate) in diff.iter().enumerate() {
            if consumed[i] || !pattern.matches_subtree(&candidate.path) {
                continue;
            }
            consumed[i] = true;
            let counterpart = find_counterpart(base_elements, candidate)
                .or_else(|| pattern.matches(&candidate.path).then_some(element));
            elements.push(match counterpart {
                Some(base_element) => merge_element(candidate, base_element),
                None => candidate.clone(),
            });
        }

        if elements.len() == before {
            // Block already spliced at an earlier element with the same path (a base slice)
            elements.push(element.clone());
        } else {
            replaced = Some(&element.path);
        }
    }

    for (i, orphan) in diff.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        let position = insertion_point(&elements, &orphan.path);
        elements.insert(position, orphan.clone());
    }

    let mut snapshot = Snapshot { element: elements };
    normalize_snapshot(&mut snapshot);
    Ok(snapshot)
}

/// Base element a differential element is merged onto: same slice first,
/// then the unsliced element with the same path.
fn find_counterpart<'a>(
    base_elements: &'a [ElementDefinition],
    element: &ElementDefinition,
) -> Option<&'a ElementDefinition> {
    if element.slice_name.is_some() {
        if let Some(slice) = base_elements
            .iter()
            .find(|b| b.path == element.path && b.slice_name == element.slice_name)
        {
            return Some(slice);
        }
    }
    base_elements
        .iter()
        .find(|b| b.path == element.path && b.slice_name.is_none())
}

/// Index just past the subtree of the nearest ancestor of `path` present in `elements`.
fn insertion_point(elements: &[ElementDefinition], path: &str) -> usize {
    let mut current = path;
    while let Some((parent, _)) = current.rsplit_once('.') {
        if let Some(start) = elements.iter().position(|e| e.path == parent) {
            return elements[start + 1..]
                .iter()
                .position(|e| e.path != parent && !e.is_descendant_of(parent))
                .map(|offset| start + 1 + offset)
                .unwrap_or(elements.len());
        }
        current = parent;
    }
    tracing::warn!(path = %path, "differential element has no ancestor in the base snapshot; appended");
    elements.len()
}

/// Generates snapshots for the StructureDefinitions of one bundle.
///
/// Definitions are identified by `url` (or `id` when they have none). Each
/// is processed at most once per [`SnapshotGenerator::generate`] run.
pub struct SnapshotGenerator<'c, C: FhirContext + ?Sized> {
    context: &'c C,
    definitions: Vec<StructureDefinition>,
    index: HashMap<String, usize>,
    processed: HashSet<String>,
    in_progress: HashSet<String>,
}

impl<'c, C: FhirContext + ?Sized> SnapshotGenerator<'c, C> {
    /// Generator over the StructureDefinitions of `bundle`; core bases come from `context`.
    pub fn new(context: &'c C, bundle: &Bundle) -> Result<Self> {
        Ok(Self::from_definitions(context, bundle.structure_definitions()?))
    }

    pub fn from_definitions(context: &'c C, definitions: Vec<StructureDefinition>) -> Self {
        let index = definitions
            .iter()
            .enumerate()
            .filter_map(|(i, sd)| definition_key(sd).map(|key| (key, i)))
            .collect();
        Self {
            context,
            definitions,
            index,
            processed: HashSet::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Process every definition of the bundle.
    pub fn generate(&mut self) -> Result<()> {
        self.processed.clear();
        let keys: Vec<String> = self.definitions.iter().filter_map(definition_key).collect();
        for key in &keys {
            self.process(key)?;
        }
        tracing::info!(
            definitions = self.definitions.len(),
            generated = self.processed.len(),
            "snapshot generation finished"
        );
        Ok(())
    }

    /// Compute the snapshot of one definition (and of its bundle bases first).
    pub fn process(&mut self, url: &str) -> Result<()> {
        let idx = *self
            .index
            .get(url)
            .ok_or_else(|| Error::UnknownDefinition(url.to_string()))?;
        let sd = &self.definitions[idx];
        if sd.is_core() || self.processed.contains(url) {
            return Ok(());
        }
        if sd.differential_elements().is_empty() {
            return Err(Error::MissingDifferential(url.to_string()));
        }
        let base_url = sd
            .base_definition
            .clone()
            .ok_or_else(|| Error::MissingBaseDefinition(url.to_string()))?;

        if !self.in_progress.insert(url.to_string()) {
            return Err(Error::CircularBase(url.to_string()));
        }
        let base = self.base_snapshot(url, &base_url);
        self.in_progress.remove(url);
        let base = base?;

        let mut differential = self.definitions[idx]
            .differential
            .clone()
            .unwrap_or_default();
        normalize_differential(&mut differential);
        let snapshot = generate_snapshot(&base, &differential)?;

        tracing::debug!(
            url = %url,
            base = %base_url,
            elements = snapshot.element.len(),
            "snapshot generated"
        );
        self.definitions[idx].snapshot = Some(snapshot);
        self.processed.insert(url.to_string());
        Ok(())
    }

    fn base_snapshot(&mut self, url: &str, base_url: &str) -> Result<Snapshot> {
        let base_url = base_url.split('|').next().unwrap_or(base_url);

        if base_url.starts_with(CORE_DEFINITION_PREFIX) {
            if !self.context.has_core_definitions() {
                return Err(Error::CoreDefinitionsNotLoaded(base_url.to_string()));
            }
            let base = self
                .context
                .get_structure_definition(base_url)?
                .ok_or_else(|| Error::BaseNotFound {
                    url: url.to_string(),
                    base: base_url.to_string(),
                })?;
            return base
                .snapshot
                .clone()
                .filter(|s| !s.element.is_empty())
                .ok_or_else(|| Error::MissingBaseSnapshot(base_url.to_string()));
        }

        let Some(&base_idx) = self.index.get(base_url) else {
            return Err(Error::BaseNotFound {
                url: url.to_string(),
                base: base_url.to_string(),
            });
        };
        if self.definitions[base_idx].snapshot_elements().is_empty() {
            self.process(base_url)?;
        }
        self.definitions[base_idx]
            .snapshot
            .clone()
            .filter(|s| !s.element.is_empty())
            .ok_or_else(|| Error::MissingBaseSnapshot(base_url.to_string()))
    }

    pub fn definitions(&self) -> &[StructureDefinition] {
        &self.definitions
    }

    pub fn get(&self, url: &str) -> Option<&StructureDefinition> {
        self.index.get(url).map(|&i| &self.definitions[i])
    }

    pub fn is_processed(&self, url: &str) -> bool {
        self.processed.contains(url)
    }

    pub fn into_definitions(self) -> Vec<StructureDefinition> {
        self.definitions
    }

    /// Collection bundle holding every definition, snapshots included.
    pub fn into_bundle(self) -> Result<Bundle> {
        let mut bundle = Bundle::collection();
        for sd in &self.definitions {
            bundle.add_resource(sd.to_value()?);
        }
        Ok(bundle)
    }
}

fn definition_key(sd: &StructureDefinition) -> Option<String> {
    sd.url.clone().or_else(|| sd.id.clone())
}

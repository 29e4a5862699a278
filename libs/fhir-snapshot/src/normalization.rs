//! Element id normalization
//!
//! Generated snapshots carry ids derived from the element path: the path
//! itself, or `path:sliceName` for slices.

use ferrite_models::{Differential, ElementDefinition, Snapshot};

pub fn normalize_snapshot(snapshot: &mut Snapshot) {
    snapshot.element.iter_mut().for_each(normalize_element_id);
}

pub fn normalize_differential(differential: &mut Differential) {
    differential.element.iter_mut().for_each(normalize_element_id);
}

/// Slices always get `path:sliceName`; other elements keep an existing id.
pub fn normalize_element_id(element: &mut ElementDefinition) {
    match &element.slice_name {
        Some(slice_name) => {
            let expected = format!("{}:{}", element.path, slice_name);
            if element.id.as_deref() != Some(expected.as_str()) {
                element.id = Some(expected);
            }
        }
        None => {
            if element.id.is_none() {
                element.id = Some(element.path.clone());
            }
        }
    }
}

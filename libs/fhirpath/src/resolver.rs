//! Reference resolution for `resolve()`
//!
//! References are first looked up in the resources handed to the evaluation
//! (descending into nested bundles and `contained` lists), then passed to a
//! caller-supplied [`ResourceResolver`].

use crate::error::Result;
use serde_json::Value;

/// External resolution of references that are not in the local resource set.
///
/// Closures of type `Fn(&str) -> Option<Value>` implement this trait.
pub trait ResourceResolver: Send + Sync {
    /// Resolve a reference string (`Patient/123`, an absolute URL, `urn:uuid:...`).
    ///
    /// `Ok(None)` means the reference is well formed but unknown.
    fn resolve(&self, reference: &str) -> Result<Option<Value>>;
}

impl<F> ResourceResolver for F
where
    F: Fn(&str) -> Option<Value> + Send + Sync,
{
    fn resolve(&self, reference: &str) -> Result<Option<Value>> {
        Ok(self(reference))
    }
}

/// Find `reference` among `resources`.
///
/// `#id` matches a contained resource. Other references match an entry's
/// `fullUrl`, a resource's `Type/id`, or an absolute URL ending in `/Type/id`.
/// Version suffixes (`/_history/n`) are ignored.
pub fn resolve_local<'a>(reference: &str, resources: &[&'a Value]) -> Option<&'a Value> {
    if let Some(id) = reference.strip_prefix('#') {
        return resources.iter().find_map(|r| find_contained(r, id));
    }
    let reference = reference
        .split("/_history/")
        .next()
        .unwrap_or(reference);
    resources
        .iter()
        .find_map(|r| find_resource(r, None, reference))
}

fn find_resource<'a>(
    resource: &'a Value,
    full_url: Option<&str>,
    reference: &str,
) -> Option<&'a Value> {
    if matches_reference(resource, full_url, reference) {
        return Some(resource);
    }
    if let Some(entries) = bundle_entries(resource) {
        for entry in entries {
            let Some(nested) = entry.get("resource") else {
                continue;
            };
            let full_url = entry.get("fullUrl").and_then(Value::as_str);
            if let Some(found) = find_resource(nested, full_url, reference) {
                return Some(found);
            }
        }
    }
    None
}

fn matches_reference(resource: &Value, full_url: Option<&str>, reference: &str) -> bool {
    if full_url == Some(reference) {
        return true;
    }
    let (Some(ty), Some(id)) = (
        resource.get("resourceType").and_then(Value::as_str),
        resource.get("id").and_then(Value::as_str),
    ) else {
        return false;
    };
    let relative = format!("{}/{}", ty, id);
    reference == relative
        || reference
            .strip_suffix(relative.as_str())
            .is_some_and(|base| base.ends_with('/'))
}

fn find_contained<'a>(resource: &'a Value, id: &str) -> Option<&'a Value> {
    if let Some(Value::Array(contained)) = resource.get("contained") {
        if let Some(found) = contained
            .iter()
            .find(|c| c.get("id").and_then(Value::as_str) == Some(id))
        {
            return Some(found);
        }
    }
    bundle_entries(resource)?
        .iter()
        .filter_map(|entry| entry.get("resource"))
        .find_map(|nested| find_contained(nested, id))
}

fn bundle_entries(resource: &Value) -> Option<&Vec<Value>> {
    if resource.get("resourceType").and_then(Value::as_str) != Some("Bundle") {
        return None;
    }
    resource.get("entry").and_then(Value::as_array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_relative_absolute_and_full_url() {
        let bundle = json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {
                    "fullUrl": "urn:uuid:7f3c2a40-0d7e-4c55-9f0a-5d1e3f8e2b10",
                    "resource": { "resourceType": "Patient", "id": "p1" }
                },
                {
                    "resource": {
                        "resourceType": "Bundle",
                        "type": "collection",
                        "entry": [{ "resource": { "resourceType": "Organization", "id": "o1" } }]
                    }
                }
            ]
        });
        let set = [&bundle];

        let by_uuid = resolve_local("urn:uuid:7f3c2a40-0d7e-4c55-9f0a-5d1e3f8e2b10", &set);
        assert_eq!(by_uuid.unwrap()["id"], "p1");
        assert_eq!(resolve_local("Patient/p1", &set).unwrap()["id"], "p1");
        assert_eq!(
            resolve_local("http://example.org/fhir/Organization/o1/_history/3", &set).unwrap()["id"],
            "o1"
        );
        assert!(resolve_local("Patient/p2", &set).is_none());
        assert!(resolve_local("XPatient/p1", &set).is_none());
    }

    #[test]
    fn contained_references() {
        let patient = json!({
            "resourceType": "Patient",
            "contained": [{ "resourceType": "Organization", "id": "org1" }]
        });
        assert_eq!(
            resolve_local("#org1", &[&patient]).unwrap()["resourceType"],
            "Organization"
        );
        assert!(resolve_local("#org2", &[&patient]).is_none());
    }

    #[test]
    fn closures_are_resolvers() {
        let resolver = |reference: &str| {
            (reference == "Patient/x").then(|| json!({ "resourceType": "Patient", "id": "x" }))
        };
        assert!(resolver.resolve("Patient/x").unwrap().is_some());
        assert!(resolver.resolve("Patient/y").unwrap().is_none());
    }
}

//! Value set resolution: expansion or compose into flat per-system code lists

use crate::parser::ConformanceParser;
use crate::schema::{Concept, ValueSetCodes};
use ferrite_models::{ValueSet, ValueSetInclude};
use std::collections::HashMap;

impl ConformanceParser {
    /// Resolve a ValueSet and store it in the schema.
    ///
    /// Included value sets must have been parsed already (see
    /// [`ConformanceParser::sort_value_set_dependencies`]). Returns `None`, and
    /// stores nothing, when the result has no codes at all.
    pub fn parse_value_set(&mut self, value_set: &ValueSet) -> Option<&ValueSetCodes> {
        let Some(url) = value_set.identity().map(str::to_string) else {
            tracing::warn!("value set without url or id; skipped");
            return None;
        };

        let mut codes = ValueSetCodes::new(url.clone());
        let expansion = value_set
            .expansion
            .as_ref()
            .filter(|e| e.contains.as_ref().is_some_and(|c| !c.is_empty()));

        if let Some(expansion) = expansion {
            for entry in expansion.flatten() {
                if !entry.is_selectable() {
                    continue;
                }
                if let Some(code) = &entry.code {
                    codes.add_codes(
                        entry.system.as_deref().unwrap_or_default(),
                        [Concept {
                            code: code.clone(),
                            display: entry.display.clone(),
                        }],
                    );
                }
            }
        } else if let Some(compose) = &value_set.compose {
            for include in &compose.include {
                self.apply_include(&mut codes, include);
            }
            for exclude in compose.exclude.iter().flatten() {
                apply_exclude(&mut codes, exclude);
            }
        }

        codes.systems.retain(|s| !s.codes.is_empty());
        if codes.code_count() == 0 {
            tracing::debug!(url = %url, "value set has no codes; not stored");
            return None;
        }

        self.schema.value_sets.insert(url.clone(), codes);
        self.schema.value_sets.get(&url)
    }

    fn apply_include(&self, codes: &mut ValueSetCodes, include: &ValueSetInclude) {
        for imported in include.value_set.iter().flatten() {
            let imported = imported.split('|').next().unwrap_or(imported);
            match self.schema.value_sets.get(imported) {
                Some(nested) => {
                    for system in &nested.systems {
                        codes.add_codes(&system.system, system.codes.iter().cloned());
                    }
                }
                None => tracing::debug!(value_set = %imported, "included value set not loaded"),
            }
        }

        let system = include.system.as_deref().unwrap_or_default();
        if let Some(concepts) = include.concept.as_ref().filter(|c| !c.is_empty()) {
            codes.add_codes(
                system,
                concepts.iter().map(|c| Concept {
                    code: c.code.clone(),
                    display: c.display.clone(),
                }),
            );
            return;
        }

        if system.is_empty() {
            return;
        }
        if include.filter.as_ref().is_some_and(|f| !f.is_empty()) {
            tracing::debug!(system = %system, "include filters are not evaluated");
        }
        match self.code_systems.iter().find(|cs| cs.url == system) {
            Some(code_system) => codes.add_codes(
                system,
                code_system.flattened_concepts().into_iter().map(|c| Concept {
                    code: c.code.clone(),
                    display: c.display.clone(),
                }),
            ),
            None => tracing::debug!(system = %system, "code system not loaded"),
        }
    }

    /// Order value sets so every value set comes after the ones it includes.
    ///
    /// Cycles are broken where they are detected; the order is then best
    /// effort and a warning names the value set.
    pub fn sort_value_set_dependencies(value_sets: Vec<ValueSet>) -> Vec<ValueSet> {
        let index: HashMap<String, usize> = value_sets
            .iter()
            .enumerate()
            .filter_map(|(i, vs)| vs.identity().map(|id| (id.to_string(), i)))
            .collect();

        let mut state = vec![VisitState::New; value_sets.len()];
        let mut order = Vec::with_capacity(value_sets.len());
        for i in 0..value_sets.len() {
            visit(i, &value_sets, &index, &mut state, &mut order);
        }

        let mut slots: Vec<Option<ValueSet>> = value_sets.into_iter().map(Some).collect();
        order.into_iter().filter_map(|i| slots[i].take()).collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    New,
    Visiting,
    Done,
}

fn visit(
    i: usize,
    value_sets: &[ValueSet],
    index: &HashMap<String, usize>,
    state: &mut [VisitState],
    order: &mut Vec<usize>,
) {
    match state[i] {
        VisitState::Done => return,
        VisitState::Visiting => {
            tracing::warn!(
                value_set = value_sets[i].identity().unwrap_or_default(),
                "cyclic value set include; ordering is best effort"
            );
            return;
        }
        VisitState::New => {}
    }

    state[i] = VisitState::Visiting;
    for dependency in value_sets[i].imported_value_sets() {
        if let Some(&j) = index.get(dependency) {
            visit(j, value_sets, index, state, order);
        }
    }
    state[i] = VisitState::Done;
    order.push(i);
}

fn apply_exclude(codes: &mut ValueSetCodes, exclude: &ValueSetInclude) {
    let system = exclude.system.as_deref().unwrap_or_default();
    match exclude.concept.as_ref().filter(|c| !c.is_empty()) {
        Some(concepts) => {
            for entry in codes.systems.iter_mut().filter(|s| s.system == system) {
                entry
                    .codes
                    .retain(|code| !concepts.iter().any(|c| c.code == code.code));
            }
        }
        None if !system.is_empty() => codes.systems.retain(|s| s.system != system),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_models::{CodeSystem, FhirVersion};
    use serde_json::json;

    fn value_set(value: serde_json::Value) -> ValueSet {
        serde_json::from_value(value).unwrap()
    }

    fn code_system() -> CodeSystem {
        serde_json::from_value(json!({
            "resourceType": "CodeSystem",
            "url": "http://example.org/cs",
            "content": "complete",
            "concept": [
                { "code": "a", "display": "A", "concept": [{ "code": "a1" }] },
                { "code": "b" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn expansion_skips_inactive_and_abstract() {
        let mut parser = ConformanceParser::new(FhirVersion::R4);
        let vs = parser
            .parse_value_set(&value_set(json!({
                "resourceType": "ValueSet",
                "url": "http://example.org/vs",
                "expansion": { "contains": [
                    { "system": "s", "code": "x" },
                    { "system": "s", "code": "y", "inactive": true },
                    { "system": "s", "code": "grp", "abstract": true, "contains": [
                        { "system": "t", "code": "z" }
                    ]}
                ]}
            })))
            .unwrap();

        assert_eq!(vs.systems.len(), 2);
        assert!(vs.contains(Some("s"), "x"));
        assert!(!vs.contains(None, "y"));
        assert!(!vs.contains(None, "grp"));
        assert!(vs.contains(Some("t"), "z"));
    }

    #[test]
    fn compose_imports_code_systems_and_nested_value_sets() {
        let mut parser = ConformanceParser::new(FhirVersion::R4);
        parser.load_code_system(code_system());
        parser.load_code_system(code_system());
        assert_eq!(parser.code_systems.len(), 1);

        parser
            .parse_value_set(&value_set(json!({
                "resourceType": "ValueSet",
                "url": "http://example.org/base",
                "compose": { "include": [{ "system": "http://example.org/cs" }] }
            })))
            .unwrap();

        let combined = parser
            .parse_value_set(&value_set(json!({
                "resourceType": "ValueSet",
                "url": "http://example.org/combined",
                "compose": {
                    "include": [
                        { "valueSet": ["http://example.org/base"] },
                        { "system": "http://example.org/other", "concept": [{ "code": "q" }] }
                    ],
                    "exclude": [
                        { "system": "http://example.org/cs", "concept": [{ "code": "b" }] }
                    ]
                }
            })))
            .unwrap();

        assert!(combined.contains(Some("http://example.org/cs"), "a1"));
        assert!(!combined.contains(None, "b"));
        assert!(combined.contains(Some("http://example.org/other"), "q"));
    }

    #[test]
    fn empty_value_set_is_not_stored() {
        let mut parser = ConformanceParser::new(FhirVersion::R4);
        let result = parser.parse_value_set(&value_set(json!({
            "resourceType": "ValueSet",
            "url": "http://example.org/empty",
            "compose": { "include": [{ "system": "http://unknown.org/cs" }] }
        })));
        assert!(result.is_none());
        assert!(parser.schema().value_set("http://example.org/empty").is_none());
    }

    #[test]
    fn dependencies_come_first_and_cycles_terminate() {
        let sets = vec![
            value_set(json!({ "resourceType": "ValueSet", "url": "c",
                "compose": { "include": [{ "valueSet": ["b"] }] } })),
            value_set(json!({ "resourceType": "ValueSet", "url": "b",
                "compose": { "include": [{ "valueSet": ["a"] }] } })),
            value_set(json!({ "resourceType": "ValueSet", "url": "a" })),
            value_set(json!({ "resourceType": "ValueSet", "url": "x",
                "compose": { "include": [{ "valueSet": ["y"] }] } })),
            value_set(json!({ "resourceType": "ValueSet", "url": "y",
                "compose": { "include": [{ "valueSet": ["x"] }] } })),
        ];

        let sorted = ConformanceParser::sort_value_set_dependencies(sets);
        let urls: Vec<_> = sorted.iter().map(|vs| vs.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b", "c", "y", "x"]);
    }
}

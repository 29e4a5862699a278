//! Element Merge: overlay a differential element onto its base element

use ferrite_models::{
    ElementDefinition, ElementDefinitionBase, ElementDefinitionConstraint,
    ElementDefinitionSlicing, ElementDefinitionType,
};

/// Copy each listed field from `$diff` onto `$merged` when the differential sets it.
macro_rules! overlay {
    ($merged:ident, $diff:ident, $($field:ident),+ $(,)?) => {
        $(
            if $diff.$field.is_some() {
                $merged.$field = $diff.$field.clone();
            }
        )+
    };
}

/// Merge `diff` onto a copy of `base`.
///
/// Simple fields are overwritten whole. `slicing`, `base`, `constraint` (by
/// `key`) and `type` (by `code`) are merged entry by entry. A value family
/// (`fixed*`, `pattern*`, ...) set in the differential replaces the base's
/// entry for that family whatever its type suffix.
pub fn merge_element(diff: &ElementDefinition, base: &ElementDefinition) -> ElementDefinition {
    let mut merged = base.clone();
    if merged.path != diff.path {
        // A concrete choice arm merged onto its `[x]` base
        merged.path = diff.path.clone();
        merged.id = Some(diff.path.clone());
    }

    overlay!(
        merged,
        diff,
        id,
        representation,
        slice_name,
        label,
        code,
        short,
        definition,
        comment,
        requirements,
        alias,
        min,
        max,
        content_reference,
        meaning_when_missing,
        order_meaning,
        max_length,
        condition,
        must_support,
        is_modifier,
        is_modifier_reason,
        is_summary,
        example,
        binding,
    );

    if let Some(slicing) = &diff.slicing {
        merged.slicing = Some(match merged.slicing.take() {
            Some(existing) => merge_slicing(existing, slicing),
            None => slicing.clone(),
        });
    }
    if let Some(element_base) = &diff.base {
        merged.base = Some(match merged.base.take() {
            Some(existing) => merge_base(existing, element_base),
            None => element_base.clone(),
        });
    }
    if let Some(constraints) = &diff.constraint {
        let target = merged.constraint.get_or_insert_with(Vec::new);
        for constraint in constraints {
            match target.iter_mut().find(|c| c.key == constraint.key) {
                Some(existing) => merge_constraint(existing, constraint),
                None => target.push(constraint.clone()),
            }
        }
    }
    if let Some(types) = &diff.types {
        let target = merged.types.get_or_insert_with(Vec::new);
        for ty in types {
            match target.iter_mut().find(|t| t.code == ty.code) {
                Some(existing) => merge_type(existing, ty),
                None => target.push(ty.clone()),
            }
        }
    }
    if let Some(mappings) = &diff.mapping {
        let target = merged.mapping.get_or_insert_with(Vec::new);
        for mapping in mappings {
            if !target
                .iter()
                .any(|m| m.identity == mapping.identity && m.map == mapping.map)
            {
                target.push(mapping.clone());
            }
        }
    }

    for field in diff.polymorphic.iter() {
        if let Some(previous) = merged.polymorphic.set(field.clone()) {
            if previous.type_suffix != field.type_suffix {
                tracing::debug!(
                    path = %diff.path,
                    replaced = %previous.key(),
                    with = %field.key(),
                    "value family replaced"
                );
            }
        }
    }

    for (key, value) in &diff.extensions {
        merged.extensions.insert(key.clone(), value.clone());
    }

    merged
}

fn merge_slicing(
    mut existing: ElementDefinitionSlicing,
    diff: &ElementDefinitionSlicing,
) -> ElementDefinitionSlicing {
    overlay!(existing, diff, discriminator, description, ordered, rules);
    existing
}

fn merge_base(mut existing: ElementDefinitionBase, diff: &ElementDefinitionBase) -> ElementDefinitionBase {
    overlay!(existing, diff, path, min, max);
    existing
}

fn merge_constraint(existing: &mut ElementDefinitionConstraint, diff: &ElementDefinitionConstraint) {
    overlay!(existing, diff, requirements, severity, human, expression, xpath, source);
}

fn merge_type(existing: &mut ElementDefinitionType, diff: &ElementDefinitionType) {
    overlay!(existing, diff, profile, target_profile, aggregation, versioning, extension);
}

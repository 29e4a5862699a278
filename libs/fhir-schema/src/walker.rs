//! Generic property walker
//!
//! One recursive traversal of a property list, shared by object to XML, XML
//! to object and validation. The walker decides *what* to visit: choice arms
//! that are present, local references resolved with the referencing site's
//! cardinality, each item of a repeated property, the `_name` side channel of
//! primitives, and dispatch on the property type. A [`PropertyVisitor`]
//! decides what happens at each step.

use crate::primitives::PrimitiveType;
use crate::property::{Property, PropertyType};
use crate::schema::Schema;
use std::collections::HashSet;

/// How a property occurs in the source container
#[derive(Debug, Clone)]
pub enum Occurrence<T> {
    Absent,
    Single(T),
    Sequence(Vec<T>),
}

impl<T> Occurrence<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Occurrence::Absent)
    }

    fn single(self) -> Option<T> {
        match self {
            Occurrence::Single(item) => Some(item),
            _ => None,
        }
    }

    fn into_vec(self) -> Vec<T> {
        match self {
            Occurrence::Absent => Vec::new(),
            Occurrence::Single(item) => vec![item],
            Occurrence::Sequence(items) => items,
        }
    }
}

/// Expected shape of a property the source did not match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Sequence,
}

/// Per-direction behavior plugged into the [`Walker`].
///
/// `Context` is the visitor's state for one container (a JSON object being
/// read, an XML element being built, a validation path...). Hooks with a
/// default do nothing.
pub trait PropertyVisitor {
    type Context;
    type Item: Clone;
    type Error;

    /// Find `name` in the container.
    fn lookup(&self, ctx: &Self::Context, name: &str, multiple: bool) -> Occurrence<Self::Item>;

    /// Whether `_name` properties are skipped as properties of their own
    /// (they still reach [`PropertyVisitor::visit_primitive`] as `shadow`).
    fn skip_shadow_properties(&self) -> bool {
        true
    }

    /// A property (or, for choice groups, the whole group) is absent.
    /// `group_satisfied` is true when another arm of the choice group is present.
    fn absent(
        &mut self,
        _ctx: &mut Self::Context,
        _prop: &Property,
        _group_satisfied: bool,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// A repeated property is present as an empty sequence.
    fn empty_sequence(&mut self, _ctx: &mut Self::Context, _prop: &Property) -> Result<(), Self::Error> {
        Ok(())
    }

    /// The source shape does not match the property's cardinality.
    fn shape_mismatch(
        &mut self,
        ctx: &mut Self::Context,
        prop: &Property,
        expected: Cardinality,
    ) -> Result<(), Self::Error>;

    fn visit_primitive(
        &mut self,
        ctx: &mut Self::Context,
        prop: &Property,
        primitive: PrimitiveType,
        index: Option<usize>,
        value: Option<Self::Item>,
        shadow: Option<Self::Item>,
    ) -> Result<(), Self::Error>;

    /// Open a nested container for a complex, backbone or reference value.
    /// `None` skips the value.
    fn enter_complex(
        &mut self,
        ctx: &mut Self::Context,
        prop: &Property,
        type_code: &str,
        index: Option<usize>,
        item: Self::Item,
    ) -> Result<Option<Self::Context>, Self::Error>;

    fn leave_complex(
        &mut self,
        ctx: &mut Self::Context,
        prop: &Property,
        index: Option<usize>,
        child: Self::Context,
    ) -> Result<(), Self::Error>;

    /// Open an embedded resource. Returns its type name and container, or
    /// `None` to skip it.
    fn enter_resource(
        &mut self,
        ctx: &mut Self::Context,
        prop: &Property,
        index: Option<usize>,
        item: Self::Item,
    ) -> Result<Option<(String, Self::Context)>, Self::Error>;

    fn leave_resource(
        &mut self,
        ctx: &mut Self::Context,
        prop: &Property,
        index: Option<usize>,
        child: Self::Context,
    ) -> Result<(), Self::Error>;

    /// Called before a `Reference` value is walked as a complex value.
    fn visit_reference(
        &mut self,
        _ctx: &mut Self::Context,
        _prop: &Property,
        _targets: &[String],
        _index: Option<usize>,
        _item: &Self::Item,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// A type (or local reference) could not be found in the schema.
    /// `prop` is `None` for resource-level lookups.
    fn unknown_type(
        &mut self,
        ctx: &mut Self::Context,
        prop: Option<&Property>,
        type_name: &str,
    ) -> Result<(), Self::Error>;

    /// All properties of a container have been visited.
    fn finish(&mut self, _ctx: &mut Self::Context, _props: &[Property]) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// What a property dispatches to once local references are resolved
enum Dispatch<'s> {
    Primitive(PrimitiveType),
    Complex(&'s str),
    Inline(&'s str, &'s [Property]),
    Resource,
    Reference(&'s [String]),
    Unresolved(&'s str),
}

/// Recursive driver over a [`Schema`]
#[derive(Clone, Copy)]
pub struct Walker<'s> {
    schema: &'s Schema,
}

impl<'s> Walker<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Walk the properties of resource type `type_name`.
    pub fn walk_resource<V: PropertyVisitor>(
        &self,
        visitor: &mut V,
        ctx: &mut V::Context,
        type_name: &str,
    ) -> Result<(), V::Error> {
        match self.schema.get_resource(type_name) {
            Some(def) => self.walk_properties(visitor, ctx, &def.properties),
            None => visitor.unknown_type(ctx, None, type_name),
        }
    }

    /// Walk the properties of any type (`Extension`, `HumanName`, ...).
    pub fn walk_type<V: PropertyVisitor>(
        &self,
        visitor: &mut V,
        ctx: &mut V::Context,
        type_name: &str,
    ) -> Result<(), V::Error> {
        match self.schema.get_type(type_name) {
            Some(def) => self.walk_properties(visitor, ctx, &def.properties),
            None => visitor.unknown_type(ctx, None, type_name),
        }
    }

    pub fn walk_properties<V: PropertyVisitor>(
        &self,
        visitor: &mut V,
        ctx: &mut V::Context,
        props: &'s [Property],
    ) -> Result<(), V::Error> {
        let mut seen_groups: HashSet<&str> = HashSet::new();

        for prop in props {
            if prop.is_shadow() && visitor.skip_shadow_properties() {
                continue;
            }

            let occurrence = visitor.lookup(ctx, &prop.name, prop.multiple);
            let shadow = if prop.is_primitive() {
                visitor.lookup(ctx, &prop.shadow_name(), prop.multiple)
            } else {
                Occurrence::Absent
            };

            if occurrence.is_absent() && shadow.is_absent() {
                match prop.choice_group.as_deref() {
                    Some(group) => {
                        if seen_groups.insert(group) {
                            let satisfied = props
                                .iter()
                                .filter(|p| p.choice_group.as_deref() == Some(group))
                                .any(|p| {
                                    !visitor.lookup(ctx, &p.name, p.multiple).is_absent()
                                        || (p.is_primitive()
                                            && !visitor
                                                .lookup(ctx, &p.shadow_name(), p.multiple)
                                                .is_absent())
                                });
                            visitor.absent(ctx, prop, satisfied)?;
                        }
                    }
                    None => visitor.absent(ctx, prop, false)?,
                }
                continue;
            }
            if let Some(group) = prop.choice_group.as_deref() {
                seen_groups.insert(group);
            }

            let dispatch = self.dispatch(prop);
            self.walk_occurrence(visitor, ctx, prop, &dispatch, occurrence, shadow)?;
        }

        visitor.finish(ctx, props)
    }

    fn dispatch(&self, prop: &'s Property) -> Dispatch<'s> {
        match &prop.ty {
            PropertyType::Primitive(p) => Dispatch::Primitive(*p),
            PropertyType::Complex(name) => Dispatch::Complex(name),
            PropertyType::Backbone { code, children } => Dispatch::Inline(code, children),
            PropertyType::Resource => Dispatch::Resource,
            PropertyType::Reference { targets } => Dispatch::Reference(targets),
            PropertyType::LocalReference(path) => {
                match self.schema.resolve_local_reference(path) {
                    Some(resolved) => match &resolved.ty {
                        PropertyType::Backbone { code, children } => {
                            Dispatch::Inline(code, children)
                        }
                        _ => Dispatch::Unresolved(path),
                    },
                    None => Dispatch::Unresolved(path),
                }
            }
        }
    }

    fn walk_occurrence<V: PropertyVisitor>(
        &self,
        visitor: &mut V,
        ctx: &mut V::Context,
        prop: &'s Property,
        dispatch: &Dispatch<'s>,
        occurrence: Occurrence<V::Item>,
        shadow: Occurrence<V::Item>,
    ) -> Result<(), V::Error> {
        match (prop.multiple, occurrence) {
            (true, Occurrence::Single(_)) => {
                visitor.shape_mismatch(ctx, prop, Cardinality::Sequence)
            }
            (false, Occurrence::Sequence(_)) => {
                visitor.shape_mismatch(ctx, prop, Cardinality::Single)
            }
            (true, Occurrence::Sequence(items)) => {
                if items.is_empty() && shadow.is_absent() {
                    return visitor.empty_sequence(ctx, prop);
                }
                let shadows = shadow.into_vec();
                let count = items.len().max(shadows.len());
                let mut items = items.into_iter();
                let mut shadows = shadows.into_iter();
                for i in 0..count {
                    let (value, side) = (items.next(), shadows.next());
                    self.walk_item(visitor, ctx, prop, dispatch, Some(i), value, side)?;
                }
                Ok(())
            }
            (false, Occurrence::Single(item)) => {
                let side = shadow.single();
                self.walk_item(visitor, ctx, prop, dispatch, None, Some(item), side)
            }
            (true, Occurrence::Absent) => {
                for (i, side) in shadow.into_vec().into_iter().enumerate() {
                    self.walk_item(visitor, ctx, prop, dispatch, Some(i), None, Some(side))?;
                }
                Ok(())
            }
            (false, Occurrence::Absent) => {
                let side = shadow.single();
                self.walk_item(visitor, ctx, prop, dispatch, None, None, side)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_item<V: PropertyVisitor>(
        &self,
        visitor: &mut V,
        ctx: &mut V::Context,
        prop: &'s Property,
        dispatch: &Dispatch<'s>,
        index: Option<usize>,
        value: Option<V::Item>,
        shadow: Option<V::Item>,
    ) -> Result<(), V::Error> {
        if let Dispatch::Primitive(primitive) = dispatch {
            return visitor.visit_primitive(ctx, prop, *primitive, index, value, shadow);
        }
        let Some(item) = value else {
            return Ok(());
        };

        match dispatch {
            Dispatch::Primitive(_) => Ok(()),
            Dispatch::Complex(type_name) => {
                self.walk_named_complex(visitor, ctx, prop, type_name, index, item)
            }
            Dispatch::Inline(code, children) => {
                if let Some(mut child) = visitor.enter_complex(ctx, prop, code, index, item)? {
                    self.walk_properties(visitor, &mut child, children)?;
                    visitor.leave_complex(ctx, prop, index, child)?;
                }
                Ok(())
            }
            Dispatch::Reference(targets) => {
                visitor.visit_reference(ctx, prop, targets, index, &item)?;
                self.walk_named_complex(visitor, ctx, prop, "Reference", index, item)
            }
            Dispatch::Resource => {
                if let Some((type_name, mut child)) =
                    visitor.enter_resource(ctx, prop, index, item)?
                {
                    self.walk_resource(visitor, &mut child, &type_name)?;
                    visitor.leave_resource(ctx, prop, index, child)?;
                }
                Ok(())
            }
            Dispatch::Unresolved(path) => visitor.unknown_type(ctx, Some(prop), path),
        }
    }

    fn walk_named_complex<V: PropertyVisitor>(
        &self,
        visitor: &mut V,
        ctx: &mut V::Context,
        prop: &'s Property,
        type_name: &str,
        index: Option<usize>,
        item: V::Item,
    ) -> Result<(), V::Error> {
        let Some(def) = self.schema.get_type(type_name) else {
            return visitor.unknown_type(ctx, Some(prop), type_name);
        };
        if let Some(mut child) = visitor.enter_complex(ctx, prop, type_name, index, item)? {
            self.walk_properties(visitor, &mut child, &def.properties)?;
            visitor.leave_complex(ctx, prop, index, child)?;
        }
        Ok(())
    }
}

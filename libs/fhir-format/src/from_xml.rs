//! XML to object conversion

use crate::decimal;
use crate::error::{FormatError, Result};
use crate::xml::is_attribute;
use ferrite_schema::primitives::{DECIMAL_LEXICAL, INTEGER_LEXICAL};
use ferrite_schema::{
    Cardinality, Occurrence, PrimitiveType, Property, PropertyVisitor, Schema, Walker,
    SHADOW_CHILDREN,
};
use roxmltree::{Document, Node};
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// Where a property value sits in the XML source
#[derive(Debug, Clone, Copy)]
pub(crate) enum XmlItem<'a, 'input> {
    Element(Node<'a, 'input>),
    Attribute(&'a str),
}

/// One XML element being read into one JSON object
pub(crate) struct ElementContext<'a, 'input> {
    node: Node<'a, 'input>,
    object: Map<String, Value>,
    type_code: String,
    resource_root: bool,
}

impl<'a, 'input> ElementContext<'a, 'input> {
    fn new(node: Node<'a, 'input>, type_code: &str, resource_root: bool) -> Self {
        Self {
            node,
            object: Map::new(),
            type_code: type_code.to_string(),
            resource_root,
        }
    }
}

struct XmlToObject<'s, 'a, 'input: 'a> {
    walker: Walker<'s>,
    source: &'input str,
    mark_decimals: bool,
    nodes: PhantomData<Node<'a, 'input>>,
}

/// Read XML text into an in-memory resource. Decimals are kept as strings
/// holding their exact lexical form.
pub fn xml_to_resource(schema: &Schema, input: &str) -> Result<Value> {
    read_document(schema, input, false)
}

/// Convert XML text to FHIR JSON text, writing decimals as bare numerals with
/// their original precision.
pub fn xml_to_json(schema: &Schema, input: &str) -> Result<String> {
    let value = read_document(schema, input, true)?;
    let text = serde_json::to_string_pretty(&value)?;
    Ok(decimal::unwrap_markers(&text).into_owned())
}

fn read_document(schema: &Schema, input: &str, mark_decimals: bool) -> Result<Value> {
    let document = Document::parse(input)?;
    let root = document.root_element();
    let resource_type = root.tag_name().name();

    let mut ctx = ElementContext::new(root, resource_type, true);
    ctx.object.insert(
        "resourceType".to_string(),
        Value::String(resource_type.to_string()),
    );

    let walker = Walker::new(schema);
    let mut visitor = XmlToObject {
        walker,
        source: input,
        mark_decimals,
        nodes: PhantomData,
    };
    walker.walk_resource(&mut visitor, &mut ctx, resource_type)?;

    tracing::debug!(resource_type, "resource read from XML");
    Ok(Value::Object(ctx.object))
}

/// Add a value to `map`, keeping the `_name` array aligned with the value
/// array by `null` gaps.
fn insert_property(
    map: &mut Map<String, Value>,
    name: &str,
    multiple: bool,
    value: Option<Value>,
    shadow: Option<Value>,
) {
    let shadow_key = format!("_{}", name);
    if !multiple {
        if let Some(value) = value {
            map.insert(name.to_string(), value);
        }
        if let Some(shadow) = shadow {
            map.insert(shadow_key, shadow);
        }
        return;
    }

    let index = match map
        .entry(name.to_string())
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(items) => {
            items.push(value.unwrap_or(Value::Null));
            items.len() - 1
        }
        _ => return,
    };

    if shadow.is_none() && !map.contains_key(&shadow_key) {
        return;
    }
    if let Value::Array(shadows) = map
        .entry(shadow_key)
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        shadows.resize(index, Value::Null);
        shadows.push(shadow.unwrap_or(Value::Null));
    }
}

impl<'s, 'a, 'input: 'a> XmlToObject<'s, 'a, 'input> {
    fn primitive_value(&self, prop: &Property, primitive: PrimitiveType, text: &str) -> Result<Value> {
        let property = || prop.name.clone();
        match primitive {
            PrimitiveType::Boolean => match text {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(FormatError::InvalidBoolean {
                    property: property(),
                    value: text.to_string(),
                }),
            },
            PrimitiveType::Integer64 if INTEGER_LEXICAL.is_match(text) => {
                Ok(Value::String(text.to_string()))
            }
            p if p.is_integer() => text
                .parse::<i64>()
                .ok()
                .filter(|_| INTEGER_LEXICAL.is_match(text))
                .map(Value::from)
                .ok_or_else(|| FormatError::InvalidInteger {
                    property: property(),
                    value: text.to_string(),
                }),
            PrimitiveType::Decimal => {
                if !DECIMAL_LEXICAL.is_match(text) {
                    return Err(FormatError::InvalidDecimal {
                        property: property(),
                        value: text.to_string(),
                    });
                }
                Ok(if self.mark_decimals {
                    decimal::wrap(text)
                } else {
                    Value::String(text.to_string())
                })
            }
            _ => Ok(Value::String(text.to_string())),
        }
    }
}

impl<'s, 'a, 'input: 'a> PropertyVisitor for XmlToObject<'s, 'a, 'input> {
    type Context = ElementContext<'a, 'input>;
    type Item = XmlItem<'a, 'input>;
    type Error = FormatError;

    fn lookup(
        &self,
        ctx: &ElementContext<'a, 'input>,
        name: &str,
        multiple: bool,
    ) -> Occurrence<XmlItem<'a, 'input>> {
        if name.starts_with('_') {
            return Occurrence::Absent;
        }
        if is_attribute(name, &ctx.type_code, ctx.resource_root) {
            return match ctx.node.attribute(name) {
                Some(value) => Occurrence::Single(XmlItem::Attribute(value)),
                None => Occurrence::Absent,
            };
        }

        let mut found: Vec<XmlItem<'a, 'input>> = ctx
            .node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == name)
            .map(XmlItem::Element)
            .collect();
        match found.len() {
            0 => Occurrence::Absent,
            1 if !multiple => Occurrence::Single(found.remove(0)),
            _ => Occurrence::Sequence(found),
        }
    }

    fn shape_mismatch(
        &mut self,
        _ctx: &mut ElementContext<'a, 'input>,
        prop: &Property,
        expected: Cardinality,
    ) -> Result<()> {
        Err(FormatError::ShapeMismatch {
            property: prop.name.clone(),
            expected: match expected {
                Cardinality::Single => "a single element",
                Cardinality::Sequence => "repeated elements",
            },
        })
    }

    fn visit_primitive(
        &mut self,
        ctx: &mut ElementContext<'a, 'input>,
        prop: &Property,
        primitive: PrimitiveType,
        _index: Option<usize>,
        value: Option<XmlItem<'a, 'input>>,
        _shadow: Option<XmlItem<'a, 'input>>,
    ) -> Result<()> {
        let node = match value {
            None => return Ok(()),
            Some(XmlItem::Attribute(text)) => {
                let value = self.primitive_value(prop, primitive, text)?;
                insert_property(&mut ctx.object, &prop.name, prop.multiple, Some(value), None);
                return Ok(());
            }
            Some(XmlItem::Element(node)) => node,
        };

        if primitive == PrimitiveType::Xhtml {
            let markup = &self.source[node.range()];
            let value = Value::String(markup.to_string());
            insert_property(&mut ctx.object, &prop.name, prop.multiple, Some(value), None);
            return Ok(());
        }

        let value = node
            .attribute("value")
            .map(|text| self.primitive_value(prop, primitive, text))
            .transpose()?;

        let mut side = ElementContext::new(node, "Element", false);
        let walker = self.walker;
        walker.walk_properties(self, &mut side, &SHADOW_CHILDREN)?;
        let shadow = (!side.object.is_empty()).then(|| Value::Object(side.object));

        if value.is_none() && shadow.is_none() {
            return Ok(());
        }
        insert_property(&mut ctx.object, &prop.name, prop.multiple, value, shadow);
        Ok(())
    }

    fn enter_complex(
        &mut self,
        _ctx: &mut ElementContext<'a, 'input>,
        _prop: &Property,
        type_code: &str,
        _index: Option<usize>,
        item: XmlItem<'a, 'input>,
    ) -> Result<Option<ElementContext<'a, 'input>>> {
        Ok(match item {
            XmlItem::Element(node) => Some(ElementContext::new(node, type_code, false)),
            XmlItem::Attribute(_) => None,
        })
    }

    fn leave_complex(
        &mut self,
        ctx: &mut ElementContext<'a, 'input>,
        prop: &Property,
        _index: Option<usize>,
        child: ElementContext<'a, 'input>,
    ) -> Result<()> {
        let value = Value::Object(child.object);
        insert_property(&mut ctx.object, &prop.name, prop.multiple, Some(value), None);
        Ok(())
    }

    fn enter_resource(
        &mut self,
        _ctx: &mut ElementContext<'a, 'input>,
        _prop: &Property,
        _index: Option<usize>,
        item: XmlItem<'a, 'input>,
    ) -> Result<Option<(String, ElementContext<'a, 'input>)>> {
        let XmlItem::Element(wrapper) = item else {
            return Ok(None);
        };
        let node = wrapper
            .children()
            .find(|n| n.is_element())
            .ok_or(FormatError::MissingResourceType)?;
        let resource_type = node.tag_name().name();

        let mut child = ElementContext::new(node, resource_type, true);
        child.object.insert(
            "resourceType".to_string(),
            Value::String(resource_type.to_string()),
        );
        Ok(Some((resource_type.to_string(), child)))
    }

    fn leave_resource(
        &mut self,
        ctx: &mut ElementContext<'a, 'input>,
        prop: &Property,
        _index: Option<usize>,
        child: ElementContext<'a, 'input>,
    ) -> Result<()> {
        let value = Value::Object(child.object);
        insert_property(&mut ctx.object, &prop.name, prop.multiple, Some(value), None);
        Ok(())
    }

    fn unknown_type(
        &mut self,
        _ctx: &mut ElementContext<'a, 'input>,
        prop: Option<&Property>,
        type_name: &str,
    ) -> Result<()> {
        Err(match prop {
            None => FormatError::UnknownResourceType(type_name.to_string()),
            Some(prop) => FormatError::UnknownType {
                property: prop.name.clone(),
                type_name: type_name.to_string(),
            },
        })
    }

    fn finish(&mut self, ctx: &mut ElementContext<'a, 'input>, props: &[Property]) -> Result<()> {
        for child in ctx.node.children().filter(Node::is_element) {
            let name = child.tag_name().name();
            if !props.iter().any(|p| p.name == name) {
                tracing::debug!(element = name, parent = %ctx.type_code, "ignoring unknown XML element");
            }
        }
        Ok(())
    }
}

//! Object to XML conversion

use crate::decimal;
use crate::error::{FormatError, Result};
use crate::xhtml;
use crate::xml::{is_attribute, write_document, XmlElement, FHIR_NS};
use ferrite_schema::primitives::{DECIMAL_LEXICAL, INTEGER_LEXICAL};
use ferrite_schema::{
    Cardinality, Occurrence, PrimitiveType, Property, PropertyVisitor, Schema, Walker,
    SHADOW_CHILDREN,
};
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// One JSON object being written as one XML element
pub(crate) struct ObjectContext<'a> {
    object: &'a Map<String, Value>,
    element: XmlElement,
    type_code: String,
    resource_root: bool,
}

impl<'a> ObjectContext<'a> {
    fn new(object: &'a Map<String, Value>, name: &str, type_code: &str, resource_root: bool) -> Self {
        Self {
            object,
            element: XmlElement::new(name),
            type_code: type_code.to_string(),
            resource_root,
        }
    }
}

struct ObjectToXml<'s, 'a> {
    walker: Walker<'s>,
    source: PhantomData<&'a Value>,
}

/// Convert an in-memory resource to XML text.
pub fn resource_to_xml(schema: &Schema, resource: &Value) -> Result<String> {
    let object = resource
        .as_object()
        .ok_or_else(|| FormatError::ExpectedObject("resource".to_string()))?;
    let resource_type = object
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or(FormatError::MissingResourceType)?;

    let mut ctx = ObjectContext::new(object, resource_type, resource_type, true);
    ctx.element.attr("xmlns", FHIR_NS);

    let walker = Walker::new(schema);
    let mut visitor = ObjectToXml {
        walker,
        source: PhantomData,
    };
    walker.walk_resource(&mut visitor, &mut ctx, resource_type)?;

    tracing::debug!(resource_type, "resource written as XML");
    write_document(&ctx.element)
}

/// Convert FHIR JSON text to XML text, keeping decimals exactly as written.
pub fn json_to_xml(schema: &Schema, input: &str) -> Result<String> {
    let protected = decimal::protect_decimals(input);
    let value: Value = serde_json::from_str(&protected)?;
    resource_to_xml(schema, &value)
}

fn invalid(prop: &Property, primitive: PrimitiveType, value: &str) -> FormatError {
    let property = prop.name.clone();
    let value = value.to_string();
    match primitive {
        PrimitiveType::Boolean => FormatError::InvalidBoolean { property, value },
        PrimitiveType::Decimal => FormatError::InvalidDecimal { property, value },
        p if p.is_integer() => FormatError::InvalidInteger { property, value },
        _ => FormatError::InvalidPrimitive { property, value },
    }
}

/// Lexical form of a primitive JSON value
fn primitive_text(prop: &Property, primitive: PrimitiveType, value: &Value) -> Result<String> {
    match (primitive, value) {
        (PrimitiveType::Boolean, Value::Bool(b)) => Ok(b.to_string()),
        (PrimitiveType::Boolean, Value::String(s)) if s == "true" || s == "false" => Ok(s.clone()),
        (p, Value::Number(n)) if p.is_integer() => {
            if n.is_i64() || n.is_u64() {
                Ok(n.to_string())
            } else {
                Err(invalid(prop, p, &n.to_string()))
            }
        }
        (p, Value::String(s)) if p.is_integer() => {
            let text = decimal::strip_marker(s);
            if INTEGER_LEXICAL.is_match(text) {
                Ok(text.to_string())
            } else {
                Err(invalid(prop, p, text))
            }
        }
        (PrimitiveType::Decimal, Value::String(s)) => {
            let text = decimal::strip_marker(s);
            if DECIMAL_LEXICAL.is_match(text) {
                Ok(text.to_string())
            } else {
                Err(invalid(prop, primitive, text))
            }
        }
        (PrimitiveType::Decimal, Value::Number(n)) => {
            let text = n.to_string();
            if DECIMAL_LEXICAL.is_match(&text) {
                Ok(text)
            } else {
                Err(invalid(prop, primitive, &text))
            }
        }
        (PrimitiveType::Boolean, other) => Err(invalid(prop, primitive, &other.to_string())),
        (_, Value::String(s)) => Ok(decimal::strip_marker(s).to_string()),
        (_, Value::Number(n)) => Ok(n.to_string()),
        (_, Value::Bool(b)) => Ok(b.to_string()),
        (_, other) => Err(invalid(prop, primitive, &other.to_string())),
    }
}

impl<'s, 'a> PropertyVisitor for ObjectToXml<'s, 'a> {
    type Context = ObjectContext<'a>;
    type Item = &'a Value;
    type Error = FormatError;

    fn lookup(&self, ctx: &ObjectContext<'a>, name: &str, _multiple: bool) -> Occurrence<&'a Value> {
        match ctx.object.get(name) {
            None | Some(Value::Null) => Occurrence::Absent,
            Some(Value::Array(items)) => Occurrence::Sequence(items.iter().collect()),
            Some(value) => Occurrence::Single(value),
        }
    }

    fn shape_mismatch(
        &mut self,
        _ctx: &mut ObjectContext<'a>,
        prop: &Property,
        expected: Cardinality,
    ) -> Result<()> {
        Err(FormatError::ShapeMismatch {
            property: prop.name.clone(),
            expected: match expected {
                Cardinality::Single => "a single value",
                Cardinality::Sequence => "an array",
            },
        })
    }

    fn visit_primitive(
        &mut self,
        ctx: &mut ObjectContext<'a>,
        prop: &Property,
        primitive: PrimitiveType,
        _index: Option<usize>,
        value: Option<&'a Value>,
        shadow: Option<&'a Value>,
    ) -> Result<()> {
        let value = value.filter(|v| !v.is_null());

        if is_attribute(&prop.name, &ctx.type_code, ctx.resource_root) {
            if let Some(value) = value {
                let text = primitive_text(prop, primitive, value)?;
                ctx.element.attr(prop.name.as_str(), text);
            }
            return Ok(());
        }

        if primitive == PrimitiveType::Xhtml {
            if let Some(value) = value {
                let raw = value
                    .as_str()
                    .ok_or_else(|| invalid(prop, primitive, &value.to_string()))?;
                ctx.element.push_raw(xhtml::prepare_div(raw)?);
            }
            return Ok(());
        }

        let mut element = XmlElement::new(prop.name.as_str());
        if let Some(shadow) = shadow.filter(|s| !s.is_null()) {
            let object = shadow
                .as_object()
                .ok_or_else(|| FormatError::ExpectedObject(prop.shadow_name()))?;
            let mut side = ObjectContext::new(object, &prop.name, "Element", false);
            let walker = self.walker;
            walker.walk_properties(self, &mut side, &SHADOW_CHILDREN)?;
            element = side.element;
        }
        if let Some(value) = value {
            element.attr("value", primitive_text(prop, primitive, value)?);
        }

        if !element.is_empty() {
            ctx.element.push(element);
        }
        Ok(())
    }

    fn enter_complex(
        &mut self,
        _ctx: &mut ObjectContext<'a>,
        prop: &Property,
        type_code: &str,
        _index: Option<usize>,
        item: &'a Value,
    ) -> Result<Option<ObjectContext<'a>>> {
        let object = item
            .as_object()
            .ok_or_else(|| FormatError::ExpectedObject(prop.name.clone()))?;
        Ok(Some(ObjectContext::new(object, &prop.name, type_code, false)))
    }

    fn leave_complex(
        &mut self,
        ctx: &mut ObjectContext<'a>,
        _prop: &Property,
        _index: Option<usize>,
        child: ObjectContext<'a>,
    ) -> Result<()> {
        if !child.element.is_empty() {
            ctx.element.push(child.element);
        }
        Ok(())
    }

    fn enter_resource(
        &mut self,
        _ctx: &mut ObjectContext<'a>,
        prop: &Property,
        _index: Option<usize>,
        item: &'a Value,
    ) -> Result<Option<(String, ObjectContext<'a>)>> {
        let object = item
            .as_object()
            .ok_or_else(|| FormatError::ExpectedObject(prop.name.clone()))?;
        let resource_type = object
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or(FormatError::MissingResourceType)?;
        Ok(Some((
            resource_type.to_string(),
            ObjectContext::new(object, resource_type, resource_type, true),
        )))
    }

    fn leave_resource(
        &mut self,
        ctx: &mut ObjectContext<'a>,
        prop: &Property,
        _index: Option<usize>,
        child: ObjectContext<'a>,
    ) -> Result<()> {
        let mut wrapper = XmlElement::new(prop.name.as_str());
        wrapper.push(child.element);
        ctx.element.push(wrapper);
        Ok(())
    }

    fn unknown_type(
        &mut self,
        _ctx: &mut ObjectContext<'a>,
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
}

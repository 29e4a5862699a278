//! Intermediate XML element tree and its quick-xml serialization

use crate::error::Result;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

pub const FHIR_NS: &str = "http://hl7.org/fhir";
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Properties carried as XML attributes rather than child elements:
/// `id` on any element except a resource root, and `url` on `Extension`.
pub(crate) fn is_attribute(name: &str, type_code: &str, resource_root: bool) -> bool {
    (name == "id" && !resource_root) || (name == "url" && type_code == "Extension")
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum XmlNode {
    Element(XmlElement),
    /// Pre-serialized markup (narrative XHTML), written as is
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn push_raw(&mut self, markup: String) {
        self.children.push(XmlNode::Raw(markup));
    }

    /// No attributes and no children: suppressed on output.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            let escaped = escape_attribute(value);
            // Already escaped: the byte-tuple form is pushed verbatim
            start.push_attribute((key.as_bytes(), escaped.as_bytes()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.write(writer)?,
                XmlNode::Raw(markup) => {
                    writer.write_event(Event::Text(BytesText::from_escaped(markup.as_str())))?
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

/// Serialize `root` as an indented XML document.
pub(crate) fn write_document(root: &XmlElement) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    root.write(&mut writer)?;
    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

/// Escape an attribute value. Line breaks are written as character
/// references so they survive attribute-value normalization.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#xD;"),
            '\n' => out.push_str("&#xA;"),
            other => out.push(other),
        }
    }
    out
}

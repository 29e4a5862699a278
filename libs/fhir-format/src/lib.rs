//! FHIR XML ↔ JSON conversion driven by the conformance schema.
//!
//! Both directions run the [`ferrite_schema::Walker`] over the resource type,
//! so element order, repetition and primitive typing follow the schema rather
//! than the input:
//! - Root element uses the `resourceType` name in the FHIR namespace.
//! - Primitive values are encoded with the `value` attribute.
//! - Primitive metadata (`id`, `extension`) is carried through `_name` entries.
//! - Arrays are represented by repeated elements and aligned metadata arrays.
//! - `id` of a data type element and `Extension.url` are XML attributes.
//!
//! ```rust,no_run
//! use ferrite_format::{json_to_xml, xml_to_json};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let schema = ferrite_schema::Schema::default();
//! let xml = json_to_xml(&schema, r#"{"resourceType":"Patient","active":true}"#)?;
//! let json = xml_to_json(&schema, &xml)?;
//! # let _ = json;
//! # Ok(())
//! # }
//! ```

pub mod decimal;
pub mod error;
pub mod from_xml;
pub mod to_xml;
pub mod xhtml;
mod xml;

pub use decimal::protect_decimals;
pub use error::{FormatError, Result};
pub use from_xml::{xml_to_json, xml_to_resource};
pub use to_xml::{json_to_xml, resource_to_xml};
pub use xml::{escape_attribute, FHIR_NS, XHTML_NS};

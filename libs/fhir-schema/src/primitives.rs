//! Primitive type registry
//!
//! Static tables of FHIR primitive and complex data-type names, the lexical
//! rules of each primitive, and the mapping of FHIRPath `System.*` type codes.
//!
//! Name lookups use compile-time perfect hash sets (phf).

use once_cell::sync::Lazy;
use phf::phf_set;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// FHIR primitive data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveType {
    Base64Binary,
    Boolean,
    Canonical,
    Code,
    Date,
    DateTime,
    Decimal,
    Id,
    Instant,
    Integer,
    Integer64,
    Markdown,
    Oid,
    PositiveInt,
    String,
    Time,
    UnsignedInt,
    Uri,
    Url,
    Uuid,
    Xhtml,
}

/// Names of all FHIR primitive types
pub static PRIMITIVE_TYPES: phf::Set<&'static str> = phf_set! {
    "base64Binary", "boolean", "canonical", "code", "date", "dateTime",
    "decimal", "id", "instant", "integer", "integer64", "markdown", "oid",
    "positiveInt", "string", "time", "unsignedInt", "uri", "url", "uuid",
    "xhtml",
};

/// Names of the general-purpose and metadata complex data types
pub static COMPLEX_TYPES: phf::Set<&'static str> = phf_set! {
    "Address", "Age", "Annotation", "Attachment", "Availability",
    "BackboneElement", "BackboneType", "CodeableConcept", "CodeableReference",
    "Coding", "ContactDetail", "ContactPoint", "Contributor", "Count",
    "DataRequirement", "Distance", "Dosage", "Duration", "Element",
    "ElementDefinition", "Expression", "ExtendedContactDetail", "Extension",
    "HumanName", "Identifier", "MarketingStatus", "Meta", "Money",
    "MoneyQuantity", "Narrative", "ParameterDefinition", "Period",
    "Population", "ProdCharacteristic", "ProductShelfLife", "Quantity",
    "Range", "Ratio", "RatioRange", "Reference", "RelatedArtifact",
    "SampledData", "Signature", "SimpleQuantity", "SubstanceAmount", "Timing",
    "TriggerDefinition", "UsageContext", "VirtualServiceDetail",
};

/// Capitalized type names that may follow the base name of a `[x]` element
/// (`valueString`, `effectivePeriod`, ...).
pub const CHOICE_TYPE_SUFFIXES: &[&str] = &[
    "Base64Binary",
    "Boolean",
    "Canonical",
    "Code",
    "Date",
    "DateTime",
    "Decimal",
    "Id",
    "Instant",
    "Integer",
    "Integer64",
    "Markdown",
    "Oid",
    "PositiveInt",
    "String",
    "Time",
    "UnsignedInt",
    "Uri",
    "Url",
    "Uuid",
    "Address",
    "Age",
    "Annotation",
    "Attachment",
    "Availability",
    "CodeableConcept",
    "CodeableReference",
    "Coding",
    "ContactDetail",
    "ContactPoint",
    "Contributor",
    "Count",
    "DataRequirement",
    "Distance",
    "Dosage",
    "Duration",
    "Expression",
    "ExtendedContactDetail",
    "HumanName",
    "Identifier",
    "Meta",
    "Money",
    "ParameterDefinition",
    "Period",
    "Quantity",
    "Range",
    "Ratio",
    "RatioRange",
    "Reference",
    "RelatedArtifact",
    "SampledData",
    "Signature",
    "Timing",
    "TriggerDefinition",
    "UsageContext",
    "VirtualServiceDetail",
];

/// FHIRPath system type namespace used by core definitions for `.value`, `.id`
/// and `Extension.url`.
pub const FHIRPATH_SYSTEM_PREFIX: &str = "http://hl7.org/fhirpath/System.";

/// Lexical form accepted for integer-family values during conversion
pub static INTEGER_LEXICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+$").expect("integer regex must compile"));

/// Lexical form accepted for decimal values
pub static DECIMAL_LEXICAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(0|[1-9]\d*)(\.\d+)?$").expect("decimal regex must compile")
});

macro_rules! lexical {
    ($name:ident, $pattern:expr) => {
        static $name: Lazy<Regex> =
            Lazy::new(|| Regex::new($pattern).expect(concat!(stringify!($name), " must compile")));
    };
}

lexical!(BASE64_RE, r"^(\s*([0-9a-zA-Z\+/=]){4}\s*)+$");
lexical!(CODE_RE, r"^[^\s]+(\s[^\s]+)*$");
lexical!(
    DATE_RE,
    r"^([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1]))?)?$"
);
lexical!(
    DATE_TIME_RE,
    r"^([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1])(T([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?(Z|(\+|-)((0[0-9]|1[0-3]):[0-5][0-9]|14:00)))?)?)?$"
);
lexical!(ID_RE, r"^[A-Za-z0-9\-\.]{1,64}$");
lexical!(
    INSTANT_RE,
    r"^([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)-(0[1-9]|1[0-2])-(0[1-9]|[1-2][0-9]|3[0-1])T([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?(Z|(\+|-)((0[0-9]|1[0-3]):[0-5][0-9]|14:00))$"
);
lexical!(OID_RE, r"^urn:oid:[0-2](\.(0|[1-9][0-9]*))+$");
lexical!(STRING_RE, r"^[ \r\n\t\S]+$");
lexical!(TIME_RE, r"^([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?$");
lexical!(URI_RE, r"^\S*$");
lexical!(
    UUID_RE,
    r"^urn:uuid:[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$"
);

impl PrimitiveType {
    /// Primitive for a FHIR type code (`dateTime`, `positiveInt`, ...)
    pub fn from_code(code: &str) -> Option<Self> {
        let ty = match code {
            "base64Binary" => Self::Base64Binary,
            "boolean" => Self::Boolean,
            "canonical" => Self::Canonical,
            "code" => Self::Code,
            "date" => Self::Date,
            "dateTime" => Self::DateTime,
            "decimal" => Self::Decimal,
            "id" => Self::Id,
            "instant" => Self::Instant,
            "integer" => Self::Integer,
            "integer64" => Self::Integer64,
            "markdown" => Self::Markdown,
            "oid" => Self::Oid,
            "positiveInt" => Self::PositiveInt,
            "string" => Self::String,
            "time" => Self::Time,
            "unsignedInt" => Self::UnsignedInt,
            "uri" => Self::Uri,
            "url" => Self::Url,
            "uuid" => Self::Uuid,
            "xhtml" => Self::Xhtml,
            _ => return None,
        };
        Some(ty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base64Binary => "base64Binary",
            Self::Boolean => "boolean",
            Self::Canonical => "canonical",
            Self::Code => "code",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::Decimal => "decimal",
            Self::Id => "id",
            Self::Instant => "instant",
            Self::Integer => "integer",
            Self::Integer64 => "integer64",
            Self::Markdown => "markdown",
            Self::Oid => "oid",
            Self::PositiveInt => "positiveInt",
            Self::String => "string",
            Self::Time => "time",
            Self::UnsignedInt => "unsignedInt",
            Self::Uri => "uri",
            Self::Url => "url",
            Self::Uuid => "uuid",
            Self::Xhtml => "xhtml",
        }
    }

    /// Map a FHIRPath system type code to a FHIR primitive.
    ///
    /// `fhir_type` is the value of the `structuredefinition-fhir-type`
    /// extension on the type entry and wins when it names a primitive.
    pub fn from_system_code(code: &str, fhir_type: Option<&str>) -> Option<Self> {
        let name = code
            .strip_prefix(FHIRPATH_SYSTEM_PREFIX)
            .or_else(|| code.strip_prefix("System."))?;
        if let Some(primitive) = fhir_type.and_then(Self::from_code) {
            return Some(primitive);
        }
        let ty = match name {
            "Boolean" => Self::Boolean,
            "Integer" => Self::Integer,
            "Integer64" | "Long" => Self::Integer64,
            "Decimal" => Self::Decimal,
            "Date" => Self::Date,
            "DateTime" => Self::DateTime,
            "Time" => Self::Time,
            _ => Self::String,
        };
        Some(ty)
    }

    /// Values carried as JSON strings (everything except boolean and numbers)
    pub fn is_string_like(&self) -> bool {
        !matches!(self, Self::Boolean | Self::Decimal) && !self.is_integer()
    }

    /// integer, unsignedInt, positiveInt (and integer64)
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Integer | Self::UnsignedInt | Self::PositiveInt | Self::Integer64
        )
    }

    /// Lexical pattern of this primitive, if it has one
    pub fn pattern(&self) -> Option<&'static Regex> {
        let re: &'static Regex = match self {
            Self::Base64Binary => &BASE64_RE,
            Self::Code => &CODE_RE,
            Self::Date => &DATE_RE,
            Self::DateTime => &DATE_TIME_RE,
            Self::Decimal => &DECIMAL_LEXICAL,
            Self::Id => &ID_RE,
            Self::Instant => &INSTANT_RE,
            Self::Oid => &OID_RE,
            Self::String | Self::Markdown => &STRING_RE,
            Self::Time => &TIME_RE,
            Self::Uri | Self::Url | Self::Canonical => &URI_RE,
            Self::Uuid => &UUID_RE,
            Self::Integer | Self::Integer64 | Self::UnsignedInt | Self::PositiveInt => {
                &INTEGER_LEXICAL
            }
            Self::Boolean | Self::Xhtml => return None,
        };
        Some(re)
    }

    /// Whether `text` is a valid lexical form of this primitive
    pub fn is_valid_lexical(&self, text: &str) -> bool {
        match self {
            Self::Boolean => text == "true" || text == "false",
            Self::Xhtml => !text.trim().is_empty(),
            Self::UnsignedInt => {
                INTEGER_LEXICAL.is_match(text) && text.parse::<u32>().is_ok_and(|n| n <= i32::MAX as u32)
            }
            Self::PositiveInt => {
                INTEGER_LEXICAL.is_match(text)
                    && text.parse::<u32>().is_ok_and(|n| n >= 1 && n <= i32::MAX as u32)
            }
            Self::Integer => INTEGER_LEXICAL.is_match(text) && text.parse::<i32>().is_ok(),
            Self::Integer64 => INTEGER_LEXICAL.is_match(text) && text.parse::<i64>().is_ok(),
            other => other.pattern().map_or(true, |re| re.is_match(text)),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `name` is a FHIR primitive type name
pub fn is_primitive_type(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(name)
}

/// Whether `name` is a known complex data-type name
pub fn is_complex_type(name: &str) -> bool {
    COMPLEX_TYPES.contains(name)
}

/// Suffix used for a choice arm of the given type code (`string` becomes `String`)
pub fn choice_suffix(type_code: &str) -> String {
    let mut chars = type_code.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

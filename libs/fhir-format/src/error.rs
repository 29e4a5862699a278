use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("expected a JSON object for '{0}'")]
    ExpectedObject(String),

    #[error("missing resourceType property")]
    MissingResourceType,

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Unknown type '{type_name}' for property '{property}'")]
    UnknownType { property: String, type_name: String },

    #[error("Property '{property}' should be {expected}")]
    ShapeMismatch {
        property: String,
        expected: &'static str,
    },

    #[error("Invalid boolean for '{property}': '{value}'")]
    InvalidBoolean { property: String, value: String },

    #[error("Invalid integer for '{property}': '{value}'")]
    InvalidInteger { property: String, value: String },

    #[error("Invalid decimal for '{property}': '{value}'")]
    InvalidDecimal { property: String, value: String },

    #[error("Invalid primitive value for '{property}': {value}")]
    InvalidPrimitive { property: String, value: String },

    #[error("Narrative XHTML is not well-formed: {0}")]
    InvalidXhtml(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormatError>;

use serde::Serialize;
use serde_json::Value;

/// Resource id reported before the validated resource's own id is known
pub const INITIAL_RESOURCE_ID: &str = "#initial";

/// Validation result for a single resource
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub resource_type: String,
    pub valid: bool,
    pub messages: Vec<ValidatorMessage>,
}

impl ValidationOutcome {
    pub fn new(resource_type: impl Into<String>, messages: Vec<ValidatorMessage>) -> Self {
        let valid = !messages.iter().any(|m| m.severity.is_error());
        Self {
            resource_type: resource_type.into(),
            valid,
            messages,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.valid
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|m| m.severity.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Warning)
            .count()
    }

    pub fn to_operation_outcome(&self) -> Value {
        serde_json::json!({
            "resourceType": "OperationOutcome",
            "issue": self.messages.iter().map(|m| m.to_json()).collect::<Vec<_>>()
        })
    }
}

/// Individual validation finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatorMessage {
    pub severity: Severity,
    pub code: IssueCode,
    /// Dotted path with array indices (`Patient.name[0].given[1]`)
    pub location: String,
    /// Id of the enclosing resource, or [`INITIAL_RESOURCE_ID`]
    pub resource_id: String,
    pub message: String,
}

impl ValidatorMessage {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        location: impl Into<String>,
        resource_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code,
            location: location.into(),
            resource_id: resource_id.into(),
            message: message.into(),
        }
    }

    fn to_json(&self) -> Value {
        serde_json::json!({
            "severity": self.severity.as_issue_severity(),
            "code": self.code.to_string(),
            "diagnostics": self.message,
            "location": [self.location],
            "expression": [self.location],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Fatal | Self::Error)
    }

    /// OperationOutcome `issue.severity` code
    fn as_issue_severity(&self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "information",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fatal => write!(f, "fatal"),
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    Invalid,
    Structure,
    Required,
    Value,
    CodeInvalid,
    NotSupported,
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Invalid => "invalid",
            Self::Structure => "structure",
            Self::Required => "required",
            Self::Value => "value",
            Self::CodeInvalid => "code-invalid",
            Self::NotSupported => "not-supported",
        };
        write!(f, "{}", s)
    }
}

//! One validation session per resource
//!
//! A [`Session`] walks a resource with the schema walker and collects
//! messages. Embedded resources (`contained`, `Bundle.entry.resource`) get a
//! fresh session of their own whose messages are merged back on return.

use crate::message::{IssueCode, Severity, ValidatorMessage};
use crate::plan::ValidationPlan;
use crate::{ExtensibleHandling, UnknownPropertyMode};
use ferrite_models::BindingStrength;
use ferrite_schema::primitives::DECIMAL_LEXICAL;
use ferrite_schema::{
    Cardinality, Occurrence, PrimitiveType, Property, PropertyVisitor, Walker, SHADOW_CHILDREN,
};
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// Stops the walk once the plan's message limit or fail-fast rule is hit
#[derive(Debug)]
pub(crate) struct Halt;

/// One JSON object under validation
pub(crate) struct Frame<'a> {
    object: &'a Map<String, Value>,
    path: String,
    resource_root: bool,
}

pub(crate) struct Session<'s, 'a> {
    walker: Walker<'s>,
    plan: &'s ValidationPlan,
    resource_id: String,
    limit: usize,
    messages: Vec<ValidatorMessage>,
    source: PhantomData<&'a Value>,
}

fn child_path(parent: &str, name: &str, index: Option<usize>) -> String {
    match index {
        Some(i) => format!("{}.{}[{}]", parent, name, i),
        None => format!("{}.{}", parent, name),
    }
}

impl<'s, 'a> Session<'s, 'a> {
    pub fn new(
        walker: Walker<'s>,
        plan: &'s ValidationPlan,
        resource_id: String,
        limit: usize,
    ) -> Self {
        Self {
            walker,
            plan,
            resource_id,
            limit,
            messages: Vec::new(),
            source: PhantomData,
        }
    }

    pub fn into_messages(self) -> Vec<ValidatorMessage> {
        self.messages
    }

    /// Validate the resource `object` found at `path`.
    pub fn validate_resource(
        &mut self,
        object: &'a Map<String, Value>,
        path: String,
    ) -> Result<(), Halt> {
        let Some(resource_type) = object.get("resourceType").and_then(Value::as_str) else {
            let location = child_path(&path, "resourceType", None);
            return self.report(Severity::Error, IssueCode::Required, location, "Missing property");
        };

        let mut frame = Frame {
            object,
            path,
            resource_root: true,
        };
        let walker = self.walker;
        walker.walk_resource(self, &mut frame, resource_type)
    }

    fn report(
        &mut self,
        severity: Severity,
        code: IssueCode,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), Halt> {
        self.messages.push(ValidatorMessage::new(
            severity,
            code,
            location,
            self.resource_id.clone(),
            message,
        ));
        if self.messages.len() >= self.limit || (self.plan.fail_fast && severity.is_error()) {
            return Err(Halt);
        }
        Ok(())
    }

    /// Check one code against the property's bound value set.
    fn check_code(
        &mut self,
        path: &str,
        prop: &Property,
        system: Option<&str>,
        code: &str,
    ) -> Result<(), Halt> {
        let plan = self.plan;
        let Some(terminology) = &plan.terminology else {
            return Ok(());
        };
        let Some(url) = prop.value_set_url.as_deref() else {
            return Ok(());
        };
        let severity = match prop.value_set_strength {
            Some(BindingStrength::Required) => Severity::Error,
            Some(BindingStrength::Extensible | BindingStrength::Preferred)
                if terminology.extensible_handling == ExtensibleHandling::Warn =>
            {
                Severity::Warning
            }
            _ => return Ok(()),
        };

        match self.walker.schema().contains_code(url, system, code) {
            None => {
                tracing::debug!(value_set = url, path, "value set not loaded, binding not checked");
                Ok(())
            }
            Some(true) => Ok(()),
            Some(false) => {
                let shown = match system {
                    Some(system) => format!("{}#{}", system, code),
                    None => code.to_string(),
                };
                self.report(
                    severity,
                    IssueCode::CodeInvalid,
                    path,
                    format!("Code '{}' not found in value set '{}'", shown, url),
                )
            }
        }
    }

    fn check_coding(
        &mut self,
        path: &str,
        prop: &Property,
        coding: &Map<String, Value>,
    ) -> Result<(), Halt> {
        let Some(code) = coding.get("code").and_then(Value::as_str) else {
            return Ok(());
        };
        let system = coding.get("system").and_then(Value::as_str);
        self.check_code(path, prop, system, code)
    }

    /// Every coding is checked; each unmatched one is reported.
    fn check_codeable_concept(
        &mut self,
        path: &str,
        prop: &Property,
        concept: &Map<String, Value>,
    ) -> Result<(), Halt> {
        let Some(Value::Array(codings)) = concept.get("coding") else {
            return Ok(());
        };
        for (i, coding) in codings.iter().enumerate() {
            if let Some(coding) = coding.as_object() {
                self.check_coding(&child_path(path, "coding", Some(i)), prop, coding)?;
            }
        }
        Ok(())
    }
}

/// Raw text of `value` when it is not a valid instance of `primitive`
fn lexical_problem(primitive: PrimitiveType, value: &Value) -> Option<String> {
    let valid = match (primitive, value) {
        (PrimitiveType::Boolean, Value::Bool(_)) => true,
        (PrimitiveType::Integer64, Value::String(s)) => primitive.is_valid_lexical(s),
        (p, Value::Number(n)) if p.is_integer() => {
            (n.is_i64() || n.is_u64()) && p.is_valid_lexical(&n.to_string())
        }
        (PrimitiveType::Decimal, Value::Number(_)) => true,
        (PrimitiveType::Decimal, Value::String(s)) => DECIMAL_LEXICAL.is_match(s),
        (p, Value::String(s)) if p.is_string_like() => p.is_valid_lexical(s),
        _ => false,
    };
    (!valid).then(|| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn lexical_message(primitive: PrimitiveType, raw: &str, path: &str) -> String {
    match primitive {
        PrimitiveType::Boolean => {
            format!("Invalid boolean '{}' at {}: expected true or false", raw, path)
        }
        PrimitiveType::Integer
        | PrimitiveType::Integer64
        | PrimitiveType::UnsignedInt
        | PrimitiveType::PositiveInt => format!(
            "Invalid {} '{}' at {}: expected a whole number in range",
            primitive, raw, path
        ),
        PrimitiveType::Decimal => format!("Invalid decimal '{}' at {}", raw, path),
        PrimitiveType::Date => format!(
            "Invalid date '{}' at {}: expected YYYY, YYYY-MM or YYYY-MM-DD",
            raw, path
        ),
        PrimitiveType::DateTime => format!(
            "Invalid dateTime '{}' at {}: a time requires a timezone",
            raw, path
        ),
        PrimitiveType::Instant => format!(
            "Invalid instant '{}' at {}: expected a full timestamp with timezone",
            raw, path
        ),
        PrimitiveType::Time => format!("Invalid time '{}' at {}: expected hh:mm:ss", raw, path),
        PrimitiveType::Id => format!(
            "Invalid id '{}' at {}: up to 64 letters, digits, '-' or '.'",
            raw, path
        ),
        PrimitiveType::Code => format!(
            "Invalid code '{}' at {}: no leading, trailing or repeated whitespace",
            raw, path
        ),
        PrimitiveType::Xhtml => format!("Invalid narrative at {}: empty markup", path),
        other => format!("Invalid {} '{}' at {}", other, raw, path),
    }
}

/// Type name of the resource a `Reference` points at, from `type` or the
/// last two segments of `reference` (`Patient/123`, `.../Patient/123/_history/2`)
fn reference_target_type(reference: &Map<String, Value>) -> Option<String> {
    if let Some(ty) = reference.get("type").and_then(Value::as_str) {
        return Some(ty.rsplit('/').next().unwrap_or(ty).to_string());
    }
    let literal = reference.get("reference").and_then(Value::as_str)?;
    let literal = literal.split("/_history/").next().unwrap_or(literal);
    let mut segments = literal.rsplit('/');
    segments.next()?;
    let ty = segments.next()?;
    ty.chars().next().filter(char::is_ascii_uppercase)?;
    Some(ty.to_string())
}

impl<'s, 'a> PropertyVisitor for Session<'s, 'a> {
    type Context = Frame<'a>;
    type Item = &'a Value;
    type Error = Halt;

    fn lookup(&self, ctx: &Frame<'a>, name: &str, _multiple: bool) -> Occurrence<&'a Value> {
        match ctx.object.get(name) {
            None | Some(Value::Null) => Occurrence::Absent,
            Some(Value::Array(items)) => Occurrence::Sequence(items.iter().collect()),
            Some(value) => Occurrence::Single(value),
        }
    }

    fn absent(&mut self, ctx: &mut Frame<'a>, prop: &Property, group_satisfied: bool) -> Result<(), Halt> {
        if !prop.required || group_satisfied {
            return Ok(());
        }
        let location = match &prop.choice_group {
            Some(group) => format!("{}.{}[x]", ctx.path, group),
            None => child_path(&ctx.path, &prop.name, None),
        };
        self.report(Severity::Error, IssueCode::Required, location, "Missing property")
    }

    fn empty_sequence(&mut self, ctx: &mut Frame<'a>, prop: &Property) -> Result<(), Halt> {
        if !prop.required {
            return Ok(());
        }
        let location = child_path(&ctx.path, &prop.name, None);
        self.report(Severity::Error, IssueCode::Required, location, "entry is required")
    }

    fn shape_mismatch(
        &mut self,
        ctx: &mut Frame<'a>,
        prop: &Property,
        expected: Cardinality,
    ) -> Result<(), Halt> {
        let location = child_path(&ctx.path, &prop.name, None);
        let message = match expected {
            Cardinality::Sequence => "Property is not an array",
            Cardinality::Single => "Property should not be an array",
        };
        self.report(Severity::Error, IssueCode::Structure, location, message)
    }

    fn visit_primitive(
        &mut self,
        ctx: &mut Frame<'a>,
        prop: &Property,
        primitive: PrimitiveType,
        index: Option<usize>,
        value: Option<&'a Value>,
        shadow: Option<&'a Value>,
    ) -> Result<(), Halt> {
        let path = child_path(&ctx.path, &prop.name, index);

        if let Some(value) = value.filter(|v| !v.is_null()) {
            match lexical_problem(primitive, value) {
                Some(raw) => {
                    let message = lexical_message(primitive, &raw, &path);
                    self.report(Severity::Error, IssueCode::Value, path.as_str(), message)?;
                }
                None if primitive == PrimitiveType::Code => {
                    if let Some(code) = value.as_str() {
                        self.check_code(&path, prop, None, code)?;
                    }
                }
                None => {}
            }
        }

        if let Some(shadow) = shadow.filter(|s| !s.is_null()) {
            let shadow_path = child_path(&ctx.path, &prop.shadow_name(), index);
            match shadow.as_object() {
                Some(object) => {
                    let mut frame = Frame {
                        object,
                        path: shadow_path,
                        resource_root: false,
                    };
                    let walker = self.walker;
                    walker.walk_properties(self, &mut frame, &SHADOW_CHILDREN[..])?;
                }
                None => self.report(
                    Severity::Error,
                    IssueCode::Structure,
                    shadow_path,
                    "Property should be an object",
                )?,
            }
        }
        Ok(())
    }

    fn enter_complex(
        &mut self,
        ctx: &mut Frame<'a>,
        prop: &Property,
        type_code: &str,
        index: Option<usize>,
        item: &'a Value,
    ) -> Result<Option<Frame<'a>>, Halt> {
        let path = child_path(&ctx.path, &prop.name, index);
        let Some(object) = item.as_object() else {
            self.report(
                Severity::Error,
                IssueCode::Structure,
                path,
                format!("Property should be an object ({})", type_code),
            )?;
            return Ok(None);
        };

        match type_code {
            "CodeableConcept" => self.check_codeable_concept(&path, prop, object)?,
            "Coding" => self.check_coding(&path, prop, object)?,
            _ => {}
        }

        Ok(Some(Frame {
            object,
            path,
            resource_root: false,
        }))
    }

    fn leave_complex(
        &mut self,
        _ctx: &mut Frame<'a>,
        _prop: &Property,
        _index: Option<usize>,
        _child: Frame<'a>,
    ) -> Result<(), Halt> {
        Ok(())
    }

    /// Runs a nested session and merges its messages; the walker itself does
    /// not descend.
    fn enter_resource(
        &mut self,
        ctx: &mut Frame<'a>,
        prop: &Property,
        index: Option<usize>,
        item: &'a Value,
    ) -> Result<Option<(String, Frame<'a>)>, Halt> {
        let path = child_path(&ctx.path, &prop.name, index);
        let Some(object) = item.as_object() else {
            self.report(
                Severity::Error,
                IssueCode::Structure,
                path,
                "Property should be a resource object",
            )?;
            return Ok(None);
        };

        let resource_id = object
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.resource_id.clone());
        let remaining = self.limit.saturating_sub(self.messages.len());
        let mut nested = Session::new(self.walker, self.plan, resource_id, remaining);
        let result = nested.validate_resource(object, path);
        self.messages.extend(nested.messages);
        result?;
        Ok(None)
    }

    fn leave_resource(
        &mut self,
        _ctx: &mut Frame<'a>,
        _prop: &Property,
        _index: Option<usize>,
        _child: Frame<'a>,
    ) -> Result<(), Halt> {
        Ok(())
    }

    fn visit_reference(
        &mut self,
        ctx: &mut Frame<'a>,
        prop: &Property,
        targets: &[String],
        index: Option<usize>,
        item: &&'a Value,
    ) -> Result<(), Halt> {
        let plan = self.plan;
        let Some(references) = &plan.references else {
            return Ok(());
        };
        if targets.is_empty() || targets.iter().any(|t| t == "Resource") {
            return Ok(());
        }
        let Some(reference) = item.as_object() else {
            return Ok(());
        };

        let path = child_path(&ctx.path, &prop.name, index);
        match reference_target_type(reference) {
            Some(ty) if targets.iter().any(|t| *t == ty) => Ok(()),
            Some(ty) => self.report(
                Severity::Error,
                IssueCode::Invalid,
                path.as_str(),
                format!(
                    "Reference to '{}' is not allowed at {} (allowed: {})",
                    ty,
                    path,
                    targets.join(", ")
                ),
            ),
            None if references.allow_unknown_target || !reference.contains_key("reference") => {
                Ok(())
            }
            None => self.report(
                Severity::Warning,
                IssueCode::NotSupported,
                path.as_str(),
                format!("Cannot determine the target type of the reference at {}", path),
            ),
        }
    }

    fn unknown_type(
        &mut self,
        ctx: &mut Frame<'a>,
        prop: Option<&Property>,
        type_name: &str,
    ) -> Result<(), Halt> {
        match prop {
            None => self.report(
                Severity::Fatal,
                IssueCode::NotSupported,
                ctx.path.as_str(),
                format!("Unknown resource type '{}'", type_name),
            ),
            Some(prop) => self.report(
                Severity::Error,
                IssueCode::NotSupported,
                child_path(&ctx.path, &prop.name, None),
                format!("Unknown type '{}'", type_name),
            ),
        }
    }

    fn finish(&mut self, ctx: &mut Frame<'a>, props: &[Property]) -> Result<(), Halt> {
        let severity = match self.plan.structure.unknown_properties {
            UnknownPropertyMode::Error => Severity::Error,
            UnknownPropertyMode::Warning => Severity::Warning,
        };
        let object = ctx.object;
        for key in object.keys() {
            if ctx.resource_root && key == "resourceType" {
                continue;
            }
            if props.iter().any(|p| p.name == *key) {
                continue;
            }
            self.report(
                severity,
                IssueCode::Structure,
                child_path(&ctx.path, key, None),
                format!("Unknown property '{}'", key),
            )?;
        }
        Ok(())
    }
}

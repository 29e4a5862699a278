use crate::message::{ValidationOutcome, INITIAL_RESOURCE_ID};
use crate::session::{Halt, Session};
use crate::{ConfigError, Result, ValidationPlan, ValidatorConfig, ValidatorError};
use ferrite_schema::{Schema, Walker};
use serde_json::Value;
use std::sync::Arc;

/// Reusable validator - owns the plan and shares the schema
pub struct Validator {
    schema: Arc<Schema>,
    plan: ValidationPlan,
}

impl Validator {
    pub fn new(schema: Arc<Schema>, plan: ValidationPlan) -> Self {
        Self { schema, plan }
    }

    /// Compile `config` and check it targets the schema's FHIR version.
    pub fn from_config(
        schema: Arc<Schema>,
        config: &ValidatorConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let plan = config.compile()?;
        if plan.fhir_version != schema.version {
            return Err(ConfigError::FhirVersionMismatch {
                expected: schema.version,
                got: plan.fhir_version,
            });
        }
        Ok(Self::new(schema, plan))
    }

    /// Validate one resource.
    ///
    /// Only input that is not a resource at all is an `Err`; everything else
    /// ends up in the outcome's messages.
    pub fn validate(&self, resource: &Value) -> Result<ValidationOutcome> {
        let object = resource.as_object().ok_or(ValidatorError::NotAnObject)?;
        let resource_type = object
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or(ValidatorError::MissingResourceType)?;
        let resource_id = object
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(INITIAL_RESOURCE_ID);

        let mut session = Session::new(
            Walker::new(&self.schema),
            &self.plan,
            resource_id.to_string(),
            self.plan.max_messages,
        );
        if let Err(Halt) = session.validate_resource(object, resource_type.to_string()) {
            tracing::debug!(
                resource_type,
                resource_id,
                fail_fast = self.plan.fail_fast,
                max_messages = self.plan.max_messages,
                "validation stopped early"
            );
        }

        let outcome = ValidationOutcome::new(resource_type, session.into_messages());
        tracing::debug!(
            resource_type,
            valid = outcome.valid,
            errors = outcome.error_count(),
            warnings = outcome.warning_count(),
            "validated resource"
        );
        Ok(outcome)
    }

    pub fn validate_batch(&self, resources: &[Value]) -> Vec<Result<ValidationOutcome>> {
        resources.iter().map(|r| self.validate(r)).collect()
    }

    pub fn plan(&self) -> &ValidationPlan {
        &self.plan
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

//! Command implementations
//!
//! Each command returns its output instead of printing it, so the binary
//! decides where it goes.

use anyhow::{bail, Context};
use ferrite_context::DefaultFhirContext;
use ferrite_fhirpath::Engine;
use ferrite_format::{json_to_xml, xml_to_json, xml_to_resource};
use ferrite_models::{Bundle, FhirVersion};
use ferrite_schema::{ConformanceParser, Schema};
use ferrite_snapshot::SnapshotGenerator;
use ferrite_validator::{ValidationOutcome, Validator, ValidatorConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;

/// Output layout of `validate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One line per message
    Text,
    /// OperationOutcome per input
    Json,
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    serde_json::from_str(&read(path)?)
        .with_context(|| format!("{} is not valid JSON", path.display()))
}

fn is_xml(text: &str) -> bool {
    text.trim_start().starts_with('<')
}

/// Schema from the configured cache when it exists, else parsed from the
/// configured definition bundles.
pub fn load_schema(config: &AppConfig) -> anyhow::Result<Schema> {
    if let Some(cache) = config.schema_cache.as_deref().filter(|p| p.exists()) {
        let schema = Schema::load_cache(cache)
            .with_context(|| format!("Failed to load schema cache {}", cache.display()))?;
        if schema.version != config.fhir_version {
            bail!(
                "schema cache {} is for {}, configured version is {}",
                cache.display(),
                schema.version,
                config.fhir_version
            );
        }
        return Ok(schema);
    }
    if config.definitions.is_empty() {
        bail!("no schema: pass --schema with an existing cache or --definitions with conformance bundles");
    }
    parse_definitions(config.fhir_version, &config.definitions)
}

fn parse_definitions(version: FhirVersion, bundles: &[PathBuf]) -> anyhow::Result<Schema> {
    let mut parser = ConformanceParser::new(version);
    for path in bundles {
        let bundle = Bundle::from_value(&read_json(path)?)
            .with_context(|| format!("{} is not a Bundle", path.display()))?;
        parser
            .parse_bundle(&bundle)
            .with_context(|| format!("Failed to parse conformance bundle {}", path.display()))?;
        tracing::info!(path = %path.display(), "parsed conformance bundle");
    }
    Ok(parser.into_schema())
}

/// XML input becomes JSON, anything else is read as JSON and becomes XML.
pub fn convert(schema: &Schema, input: &str) -> anyhow::Result<String> {
    if is_xml(input) {
        Ok(xml_to_json(schema, input)?)
    } else {
        Ok(json_to_xml(schema, input)?)
    }
}

/// Validate each file (JSON or XML). The outcome order follows `inputs`.
pub fn validate_files(
    schema: Arc<Schema>,
    config: &ValidatorConfig,
    inputs: &[PathBuf],
) -> anyhow::Result<Vec<(PathBuf, ValidationOutcome)>> {
    let validator = Validator::from_config(Arc::clone(&schema), config)?;
    let mut outcomes = Vec::with_capacity(inputs.len());
    for path in inputs {
        let text = read(path)?;
        let resource = if is_xml(&text) {
            xml_to_resource(&schema, &text)
                .with_context(|| format!("Failed to read {} as XML", path.display()))?
        } else {
            serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", path.display()))?
        };
        let outcome = validator
            .validate(&resource)
            .with_context(|| format!("Cannot validate {}", path.display()))?;
        outcomes.push((path.clone(), outcome));
    }
    Ok(outcomes)
}

pub fn render_outcome(
    path: &Path,
    outcome: &ValidationOutcome,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(
            &outcome.to_operation_outcome(),
        )?),
        OutputFormat::Text => {
            let mut lines = vec![format!(
                "{}: {} ({} errors, {} warnings)",
                path.display(),
                if outcome.valid { "valid" } else { "invalid" },
                outcome.error_count(),
                outcome.warning_count()
            )];
            for m in &outcome.messages {
                lines.push(format!(
                    "  {} {} [{}]: {}",
                    m.severity, m.location, m.resource_id, m.message
                ));
            }
            Ok(lines.join("\n"))
        }
    }
}

/// Fill in snapshots for the profiles in `input`, with core bases from `core_dir`.
pub fn snapshot(core_dir: &Path, input: &Path) -> anyhow::Result<String> {
    let context = DefaultFhirContext::from_dir(core_dir)
        .with_context(|| format!("Failed to load core definitions from {}", core_dir.display()))?;
    let bundle = Bundle::from_value(&read_json(input)?)
        .with_context(|| format!("{} is not a Bundle", input.display()))?;

    let mut generator = SnapshotGenerator::new(&context, &bundle)?;
    generator.generate()?;
    let bundle = generator.into_bundle()?;
    Ok(serde_json::to_string_pretty(&bundle)?)
}

/// Parse `bundles` and persist the schema to `output`.
pub fn build_cache(
    version: FhirVersion,
    bundles: &[PathBuf],
    output: &Path,
) -> anyhow::Result<Schema> {
    if bundles.is_empty() {
        bail!("build-cache needs at least one conformance bundle");
    }
    let schema = parse_definitions(version, bundles)?;
    schema
        .save_cache(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(schema)
}

/// Evaluate `expression` against each input; `resolve()` sees all inputs.
pub fn evaluate(expression: &str, inputs: &[PathBuf]) -> anyhow::Result<Vec<Vec<Value>>> {
    let engine = Engine::new();
    let expr = engine.compile(expression)?;
    let resources = inputs
        .iter()
        .map(|path| read_json(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    resources
        .iter()
        .map(|resource| Ok(engine.evaluate_with_resources(&expr, resource, &resources)?))
        .collect()
}

//! Command-line definition and dispatch

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use ferrite_models::FhirVersion;
use ferrite_validator::{Preset, ValidatorConfig};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::commands::{self, OutputFormat};
use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "ferrite", version, about = "FHIR conformance, conversion and validation")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file
    #[arg(long, global = true, env = "FERRITE_CONFIG")]
    pub config: Option<PathBuf>,

    /// FHIR version of the definitions (STU3, R4, R5)
    #[arg(long, global = true)]
    pub fhir_version: Option<FhirVersion>,

    /// Schema cache file
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Conformance bundle, repeatable; used when no schema cache exists
    #[arg(long = "definitions", global = true)]
    pub definitions: Vec<PathBuf>,

    /// Log level for the ferrite crates
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert a resource between JSON and XML
    Convert {
        input: PathBuf,
        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate JSON or XML resources
    Validate {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Validator preset, ignored when a validator config file is given
        #[arg(long, value_enum)]
        preset: Option<PresetArg>,
        /// YAML validator configuration
        #[arg(long)]
        validator_config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Generate snapshots for the profiles in a bundle
    Snapshot {
        /// Directory with the core StructureDefinitions
        #[arg(long)]
        core: PathBuf,
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse conformance bundles and write a schema cache
    BuildCache {
        #[arg(required = true)]
        bundles: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Evaluate a path expression against resources
    Eval {
        expression: String,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    Ingestion,
    Server,
    Authoring,
    Publication,
}

impl From<PresetArg> for Preset {
    fn from(value: PresetArg) -> Self {
        match value {
            PresetArg::Ingestion => Preset::Ingestion,
            PresetArg::Server => Preset::Server,
            PresetArg::Authoring => Preset::Authoring,
            PresetArg::Publication => Preset::Publication,
        }
    }
}

impl GlobalArgs {
    /// Flags win over file and environment settings.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(version) = self.fhir_version {
            config.fhir_version = version;
        }
        if let Some(schema) = &self.schema {
            config.schema_cache = Some(schema.clone());
        }
        if !self.definitions.is_empty() {
            config.definitions = self.definitions.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.log_json {
            config.logging.json = true;
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::load(self.global.config.as_deref())?;
        self.global.apply(&mut config);
        Ok(config)
    }
}

fn emit(output: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", text)?;
            Ok(())
        }
    }
}

fn validator_config(
    app: &AppConfig,
    file: Option<&Path>,
    preset: Option<PresetArg>,
) -> anyhow::Result<ValidatorConfig> {
    let file = file.or(app.validator_config.as_deref());
    let mut config = match (file, preset) {
        (Some(path), _) => {
            let yaml = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            ValidatorConfig::from_yaml(&yaml)
                .with_context(|| format!("Invalid validator configuration {}", path.display()))?
        }
        (None, Some(preset)) => ValidatorConfig::preset(preset.into()),
        (None, None) => ValidatorConfig::default(),
    };
    config.fhir.version = app.fhir_version;
    Ok(config)
}

/// Run `command`. Invalid resources give a failing exit code.
pub fn run(command: Command, config: &AppConfig) -> anyhow::Result<ExitCode> {
    match command {
        Command::Convert { input, output } => {
            let schema = commands::load_schema(config)?;
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            emit(output.as_deref(), &commands::convert(&schema, &text)?)?;
        }
        Command::Validate {
            inputs,
            preset,
            validator_config: file,
            format,
        } => {
            let schema = Arc::new(commands::load_schema(config)?);
            let validator = validator_config(config, file.as_deref(), preset)?;
            let outcomes = commands::validate_files(schema, &validator, &inputs)?;

            let mut all_valid = true;
            for (path, outcome) in &outcomes {
                all_valid &= outcome.valid;
                emit(None, &commands::render_outcome(path, outcome, format)?)?;
            }
            if !all_valid {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Snapshot {
            core,
            input,
            output,
        } => {
            emit(output.as_deref(), &commands::snapshot(&core, &input)?)?;
        }
        Command::BuildCache { bundles, output } => {
            let schema = commands::build_cache(config.fhir_version, &bundles, &output)?;
            tracing::info!(
                types = schema.types.len(),
                value_sets = schema.value_sets.len(),
                path = %output.display(),
                "schema cache written"
            );
        }
        Command::Eval { expression, inputs } => {
            let results = commands::evaluate(&expression, &inputs)?;
            for (path, result) in inputs.iter().zip(results) {
                emit(
                    None,
                    &format!("{}: {}", path.display(), serde_json::Value::Array(result)),
                )?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_configuration() {
        let cli = Cli::parse_from([
            "ferrite",
            "--fhir-version",
            "R5",
            "--definitions",
            "a.json",
            "--definitions",
            "b.json",
            "--log-level",
            "debug",
            "eval",
            "Patient.id",
            "p.json",
        ]);
        let mut config = AppConfig::default();
        cli.global.apply(&mut config);

        assert_eq!(config.fhir_version, FhirVersion::R5);
        assert_eq!(
            config.definitions,
            vec![PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
        assert_eq!(config.logging.level, "debug");
        assert!(matches!(cli.command, Command::Eval { .. }));
    }

    #[test]
    fn preset_is_applied_with_the_configured_version() {
        let app = AppConfig {
            fhir_version: FhirVersion::R5,
            ..AppConfig::default()
        };
        let config = validator_config(&app, None, Some(PresetArg::Publication)).unwrap();
        assert_eq!(config.preset, Some(Preset::Publication));
        assert_eq!(config.fhir.version, FhirVersion::R5);
    }
}

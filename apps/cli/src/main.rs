//! ferrite binary entry point

use anyhow::Context;
use clap::Parser;
use ferrite_cli::{logging, run, Cli};
use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.load_config().context("Failed to load configuration")?;

    logging::init_logging(&config.logging).context("Failed to initialize logging")?;
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        fhir_version = %config.fhir_version,
        "Starting ferrite"
    );

    run(cli.command, &config)
}

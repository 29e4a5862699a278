//! Logging initialization for the CLI
//!
//! Logs go to stderr so command output on stdout stays machine readable.
//! `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const CRATES: &[&str] = &[
    "ferrite",
    "ferrite_cli",
    "ferrite_context",
    "ferrite_fhirpath",
    "ferrite_format",
    "ferrite_models",
    "ferrite_schema",
    "ferrite_snapshot",
    "ferrite_validator",
];

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = build_env_filter(config);
    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr);
        subscriber
            .with(layer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(std::io::stderr);
        subscriber
            .with(layer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    }

    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATES
            .iter()
            .map(|name| format!("{}={}", name, config.level))
            .collect();
        EnvFilter::new(directives.join(","))
    })
}

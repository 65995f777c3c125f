//! Logging and metric helpers shared by the Chatlayer bridge crates.
//!
//! [`install`] sets up the global `tracing` subscriber from the environment;
//! the recorders forward to the `metrics` facade once metrics are enabled.

use anyhow::{Result, anyhow};
use tracing_subscriber::layer::Layer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod context;
mod recorders;

pub use config::{LogFormat, TelemetryConfig};
pub use context::{MessageContext, TelemetryLabels};
pub use recorders::{record_counter, record_histogram, telemetry_enabled, with_common_fields};

/// Installs the global subscriber configured from `RUST_LOG`, `LOG_FORMAT`
/// and friends. Log lines go to stderr so stdout stays free for command output.
pub fn install(service_name: &str, service_version: &str) -> Result<()> {
    init_telemetry(TelemetryConfig::from_env(service_name, service_version))
}

pub fn init_telemetry(cfg: TelemetryConfig) -> Result<()> {
    recorders::set_metrics_enabled(cfg.metrics_enabled);

    let fmt_layer = match cfg.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.default_filter))
        .map_err(|err| anyhow!("invalid log filter `{}`: {err}", cfg.default_filter))?;

    // A subscriber may already be installed by a test harness or an embedding host.
    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
    {
        tracing::info!(
            service = %cfg.service_name,
            version = %cfg.service_version,
            environment = %cfg.environment,
            "telemetry installed"
        );
    }

    Ok(())
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clb_core::{ConnectorConfig, OutboundMessage};
use clb_translator::{Connector, RestSettings};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::info;

const REDACTED: &str = "***";

#[derive(Parser, Debug)]
#[command(author, version, about = "Encode and decode Chatlayer webhook messages", long_about = None)]
struct Opts {
    /// YAML settings file; CHATLAYER_* environment variables are used when omitted
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the REST transport settings derived from the configuration
    Settings {
        /// Print tokens and passwords instead of masking them
        #[arg(long)]
        show_secrets: bool,
    },
    /// Encode a user turn (JSON) into a webhook request body
    Encode {
        #[arg(long, default_value = "cli-conversation")]
        conversation_id: String,
        /// File holding the outbound message; stdin when omitted
        #[arg(long, value_name = "PATH")]
        message: Option<PathBuf>,
    },
    /// Decode a webhook delivery (JSON) into a bot reply
    Decode {
        /// File holding the webhook payload; stdin when omitted
        #[arg(long, value_name = "PATH")]
        payload: Option<PathBuf>,
    },
    /// Print the turns sent right after the transport starts
    Startup,
}

#[tokio::main]
async fn main() -> Result<()> {
    clb_telemetry::install("chatlayer-cli", env!("CARGO_PKG_VERSION"))?;
    let opts = Opts::parse();
    let connector = Connector::new(load_config(opts.config.as_deref()).await?);

    let output = match opts.command {
        Command::Settings { show_secrets } => {
            let mut settings = connector.rest_settings();
            if !show_secrets {
                redact(&mut settings);
            }
            serde_json::to_value(settings)?
        }
        Command::Encode {
            conversation_id,
            message,
        } => {
            let raw = read_json(message.as_deref()).await?;
            let msg: OutboundMessage =
                serde_json::from_value(raw).context("input is not an outbound message")?;
            serde_json::to_value(connector.encoder().encode(&conversation_id, &msg))?
        }
        Command::Decode { payload } => {
            let raw = read_json(payload.as_deref()).await?;
            match connector.response_hook(&raw).await {
                Some(msg) => serde_json::to_value(msg)?,
                None => {
                    info!("webhook ignored");
                    Value::Null
                }
            }
        }
        Command::Startup => serde_json::to_value(connector.startup_messages())?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn load_config(path: Option<&Path>) -> Result<ConnectorConfig> {
    match path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            ConnectorConfig::from_yaml_str(&raw)
                .with_context(|| format!("invalid settings in {}", path.display()))
        }
        None => ConnectorConfig::from_env().context("invalid CHATLAYER_* environment"),
    }
}

async fn read_json(path: Option<&Path>) -> Result<Value> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("input is not valid JSON")
}

fn redact(settings: &mut RestSettings) {
    if let Some(auth) = settings.headers.get_mut("Authorization")
        && !auth.contains("{{")
    {
        *auth = format!("Bearer {REDACTED}");
    }
    if let Some(ping) = settings.ping.as_mut()
        && let Some(password) = ping.body.get_mut("password")
    {
        *password = Value::String(REDACTED.into());
    }
}

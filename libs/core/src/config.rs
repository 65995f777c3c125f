use std::env;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::capabilities::ConnectorCapabilities;
use crate::types::is_truthy;

pub const DEFAULT_BASE_URL: &str = "https://api.chatlayer.ai";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_API_VERSION: &str = "v1";
pub const DEFAULT_INBOUND_SELECTOR: &str = "$.body.senderId";

pub const URL_KEY: &str = "CHATLAYER_URL";
pub const CHANNEL_ID_KEY: &str = "CHATLAYER_CHANNEL_ID";
pub const ACCESS_TOKEN_KEY: &str = "CHATLAYER_ACCESS_TOKEN";
pub const EMAIL_KEY: &str = "CHATLAYER_EMAIL";
pub const PASSWORD_KEY: &str = "CHATLAYER_PASSWORD";
pub const VERIFY_TOKEN_KEY: &str = "CHATLAYER_VERIFY_TOKEN";
pub const SESSION_DATA_KEY: &str = "CHATLAYER_SESSION_DATA";
pub const WELCOME_MESSAGE_KEY: &str = "CHATLAYER_WELCOME_MESSAGE";
pub const BOT_ID_KEY: &str = "CHATLAYER_BOT_ID";
pub const LANGUAGE_KEY: &str = "CHATLAYER_LANGUAGE";
pub const API_VERSION_KEY: &str = "CHATLAYER_API_VERSION";
pub const INBOUND_SELECTOR_KEY: &str = "CHATLAYER_INBOUND_SELECTOR";
pub const SUPPORTS_MEDIA_KEY: &str = "CHATLAYER_SUPPORTS_MEDIA";
pub const SUPPORTS_CARDS_KEY: &str = "CHATLAYER_SUPPORTS_CARDS";
pub const SUPPORTS_NLP_ENRICHMENT_KEY: &str = "CHATLAYER_SUPPORTS_NLP_ENRICHMENT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} setting required")]
    MissingSetting(&'static str),
    #[error("{name} is invalid: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
    #[error("failed to parse connector settings")]
    Parse(#[from] serde_yaml_bw::Error),
}

/// How the connector authenticates against the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    AccessToken(String),
    /// Token obtained by the transport's login call at session start.
    Login { email: String, password: String },
}

impl Credentials {
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Credentials::AccessToken(token) => Some(token),
            Credentials::Login { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NlpSettings {
    pub bot_id: String,
    pub language: String,
    pub api_version: String,
}

/// Validated, read-only connector configuration.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub base_url: String,
    pub channel_id: String,
    pub credentials: Credentials,
    pub verify_token: String,
    pub session_data: Option<Value>,
    /// Send an intro turn on start. Unlike a presence-only check, a set but
    /// falsy value (`""`, `0`, `false`, `no`, `off`) leaves it disabled.
    pub welcome_message: bool,
    pub nlp: Option<NlpSettings>,
    pub inbound_selector: String,
    pub capabilities: ConnectorCapabilities,
}

impl ConnectorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        ConnectorSettings::from_lookup(lookup).resolve()
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: ConnectorSettings = serde_yaml_bw::from_str(raw)?;
        settings.resolve()
    }

    /// `{base}/v1/channels/webhook/{channel}/messages`
    pub fn webhook_url(&self) -> String {
        format!(
            "{}/v1/channels/webhook/{}/messages",
            self.base_url, self.channel_id
        )
    }

    /// `{base}/{version}/bots/{bot}/nlp/extract`, when enrichment is configured.
    pub fn nlp_extract_url(&self) -> Option<String> {
        self.nlp.as_ref().map(|nlp| {
            format!(
                "{}/{}/bots/{}/nlp/extract",
                self.base_url, nlp.api_version, nlp.bot_id
            )
        })
    }
}

/// Unvalidated settings as they appear in a YAML file or the environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    pub url: Option<String>,
    pub channel_id: Option<String>,
    pub access_token: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub verify_token: Option<Value>,
    pub session_data: Option<Value>,
    pub welcome_message: Option<Value>,
    pub bot_id: Option<String>,
    pub language: Option<String>,
    pub api_version: Option<String>,
    pub inbound_selector: Option<String>,
    pub capabilities: ConnectorCapabilities,
}

impl ConnectorSettings {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ConnectorCapabilities::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(default)
        };
        let capabilities = ConnectorCapabilities {
            media: flag(SUPPORTS_MEDIA_KEY, defaults.media),
            cards: flag(SUPPORTS_CARDS_KEY, defaults.cards),
            nlp_enrichment: flag(SUPPORTS_NLP_ENRICHMENT_KEY, defaults.nlp_enrichment),
        };

        Self {
            url: lookup(URL_KEY),
            channel_id: lookup(CHANNEL_ID_KEY),
            access_token: lookup(ACCESS_TOKEN_KEY),
            email: lookup(EMAIL_KEY),
            password: lookup(PASSWORD_KEY),
            verify_token: lookup(VERIFY_TOKEN_KEY).map(Value::String),
            // structured session data is written as JSON; anything else stays a string
            session_data: lookup(SESSION_DATA_KEY)
                .map(|raw| serde_json::from_str(&raw).unwrap_or(Value::String(raw))),
            welcome_message: lookup(WELCOME_MESSAGE_KEY).map(Value::String),
            bot_id: lookup(BOT_ID_KEY),
            language: lookup(LANGUAGE_KEY),
            api_version: lookup(API_VERSION_KEY),
            inbound_selector: lookup(INBOUND_SELECTOR_KEY),
            capabilities,
        }
    }

    pub fn resolve(self) -> Result<ConnectorConfig, ConfigError> {
        let base_url = match self.url {
            Some(url) => non_empty(Some(url)).ok_or(ConfigError::MissingSetting(URL_KEY))?,
            None => DEFAULT_BASE_URL.to_string(),
        };
        Url::parse(&base_url).map_err(|err| ConfigError::InvalidSetting {
            name: URL_KEY,
            reason: err.to_string(),
        })?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let channel_id =
            non_empty(self.channel_id).ok_or(ConfigError::MissingSetting(CHANNEL_ID_KEY))?;

        let credentials = match (
            non_empty(self.access_token),
            non_empty(self.email),
            non_empty(self.password),
        ) {
            (Some(token), _, _) => Credentials::AccessToken(token),
            (None, Some(email), Some(password)) => Credentials::Login { email, password },
            _ => return Err(ConfigError::MissingSetting(ACCESS_TOKEN_KEY)),
        };

        let verify_token = self
            .verify_token
            .as_ref()
            .and_then(scalar_to_string)
            .and_then(|v| non_empty(Some(v)))
            .ok_or(ConfigError::MissingSetting(VERIFY_TOKEN_KEY))?;

        let nlp = non_empty(self.bot_id).map(|bot_id| NlpSettings {
            bot_id,
            language: non_empty(self.language).unwrap_or_else(|| DEFAULT_LANGUAGE.into()),
            api_version: non_empty(self.api_version)
                .unwrap_or_else(|| DEFAULT_API_VERSION.into()),
        });

        Ok(ConnectorConfig {
            base_url,
            channel_id,
            credentials,
            verify_token,
            session_data: self.session_data.filter(|v| !v.is_null()),
            welcome_message: self.welcome_message.as_ref().is_some_and(welcome_flag),
            nlp,
            inbound_selector: non_empty(self.inbound_selector)
                .unwrap_or_else(|| DEFAULT_INBOUND_SELECTOR.into()),
            capabilities: self.capabilities,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Renders scalar JSON the way it would appear on the wire.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn welcome_flag(value: &Value) -> bool {
    match value {
        Value::String(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        ),
        other => is_truthy(other),
    }
}

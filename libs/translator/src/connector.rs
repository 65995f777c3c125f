use std::collections::BTreeMap;
use std::sync::Arc;

use clb_core::{ConfigError, ConnectorConfig, Credentials, InboundMessage, OutboundMessage};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::chatlayer::{ChatlayerDecoder, ChatlayerEncoder};
use crate::nlp::ReqwestNlpClient;
use crate::{Decoder, Encoder};

/// Placeholder the transport replaces with the conversation being tested.
pub const CONVERSATION_ID_TEMPLATE: &str = "{{botium.conversationId}}";
/// Placeholder the transport replaces with the token returned by the login ping.
pub const CONTEXT_TOKEN_TEMPLATE: &str = "{{context.token}}";

/// Everything the REST transport needs to talk to one Chatlayer channel.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestSettings {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body_template: Value,
    pub inbound_selector: InboundSelector,
    pub ignore_empty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping: Option<PingSettings>,
}

/// Routes asynchronous webhook deliveries back to the waiting conversation.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundSelector {
    pub json_path: String,
    pub value: String,
}

/// Login call made at session start when no static token is configured.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PingSettings {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    pub token_path: String,
}

/// Binds configuration, encoder and decoder into the hooks a REST transport
/// container drives.
#[derive(Clone)]
pub struct Connector {
    config: Arc<ConnectorConfig>,
    encoder: Arc<dyn Encoder>,
    decoder: Arc<dyn Decoder>,
}

impl Connector {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(ConnectorConfig::from_env()?))
    }

    pub fn new(config: ConnectorConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Builds the default encoder and decoder; the client is used for the
    /// NLU enrichment call only.
    pub fn with_http_client(config: ConnectorConfig, client: reqwest::Client) -> Self {
        let encoder = ChatlayerEncoder::from_config(&config);
        let mut decoder = ChatlayerDecoder::from_config(&config);

        if config.capabilities.nlp_enrichment && config.nlp.is_some() {
            match ReqwestNlpClient::from_config(client, &config) {
                Ok(Some(nlp)) => decoder = decoder.with_nlp_extractor(Arc::new(nlp)),
                Ok(None) => warn!("nlp enrichment needs a static access token; using inline intents"),
                Err(err) => warn!(error = %err, "nlp enrichment disabled"),
            }
        }

        Self::with_parts(config, Arc::new(encoder), Arc::new(decoder))
    }

    pub fn with_parts(
        config: ConnectorConfig,
        encoder: Arc<dyn Encoder>,
        decoder: Arc<dyn Decoder>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            encoder,
            decoder,
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn encoder(&self) -> Arc<dyn Encoder> {
        self.encoder.clone()
    }

    pub fn decoder(&self) -> Arc<dyn Decoder> {
        self.decoder.clone()
    }

    pub fn rest_settings(&self) -> RestSettings {
        let mut headers = BTreeMap::new();
        let token = match &self.config.credentials {
            Credentials::AccessToken(token) => token.clone(),
            Credentials::Login { .. } => CONTEXT_TOKEN_TEMPLATE.to_string(),
        };
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));

        RestSettings {
            url: self.config.webhook_url(),
            method: "POST".into(),
            headers,
            body_template: json!({
                "conversationId": CONVERSATION_ID_TEMPLATE,
                "message": {}
            }),
            inbound_selector: InboundSelector {
                json_path: self.config.inbound_selector.clone(),
                value: CONVERSATION_ID_TEMPLATE.into(),
            },
            ignore_empty: true,
            ping: self.ping_settings(),
        }
    }

    fn ping_settings(&self) -> Option<PingSettings> {
        let Credentials::Login { email, password } = &self.config.credentials else {
            return None;
        };
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Some(PingSettings {
            url: format!("{}/v1/auth/login", self.config.base_url),
            method: "POST".into(),
            headers,
            body: json!({ "email": email, "password": password }),
            token_path: "$.token".into(),
        })
    }

    /// Request hook: fills the transport's body template for one user turn.
    pub fn request_hook(&self, body: &mut Value, msg: &OutboundMessage) {
        self.encoder.apply(body, msg);
    }

    /// Response hook: decodes one webhook delivery, `None` when it is ignored.
    pub async fn response_hook(&self, payload: &Value) -> Option<InboundMessage> {
        self.decoder.decode(payload).await
    }

    /// Turns to send right after the transport starts.
    pub fn startup_messages(&self) -> Vec<OutboundMessage> {
        if self.config.welcome_message {
            info!("sending welcome intro message");
            vec![OutboundMessage::intro()]
        } else {
            Vec::new()
        }
    }
}

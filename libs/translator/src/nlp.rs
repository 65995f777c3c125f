use std::time::Instant;

use async_trait::async_trait;
use clb_core::{ConnectorConfig, IntentScore, NlpEntity};
use clb_telemetry::{TelemetryLabels, record_counter, record_histogram};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::telemetry::CONNECTOR_NAME;

const EXTRACT_ENDPOINT: &str = "nlp.extract";
const ERRORS_COUNTER: &str = "chatlayer_nlp_errors_total";
const ROUNDTRIP_HISTOGRAM: &str = "chatlayer_nlp_roundtrip_seconds";

/// Ranked intents and entities returned by the extract endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NlpExtract {
    pub intents: Vec<IntentScore>,
    pub entities: Vec<NlpEntity>,
}

#[async_trait]
pub trait NlpExtractor: Send + Sync {
    async fn extract(&self, expression: &str) -> Result<NlpExtract, NlpError>;
}

#[derive(Debug, Error)]
pub enum NlpError {
    #[error("nlp extract configuration error: {0}")]
    Config(String),
    #[error("nlp extract transport error")]
    Transport(#[source] reqwest::Error),
    #[error("nlp extract remote error (status {status})")]
    Remote { status: StatusCode, message: String },
    #[error("nlp extract response decode error")]
    Decode(#[source] reqwest::Error),
}

/// Calls `POST {base}/{version}/bots/{bot}/nlp/extract` with the static access token.
pub struct ReqwestNlpClient {
    client: Client,
    endpoint: Url,
    access_token: String,
    language: String,
}

impl ReqwestNlpClient {
    pub fn new(
        client: Client,
        endpoint: &str,
        access_token: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, NlpError> {
        let endpoint = Url::parse(endpoint).map_err(|err| NlpError::Config(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            access_token: access_token.into(),
            language: language.into(),
        })
    }

    /// Returns `None` when enrichment is not configured or no static token is
    /// available to authenticate with.
    pub fn from_config(client: Client, config: &ConnectorConfig) -> Result<Option<Self>, NlpError> {
        let (Some(nlp), Some(endpoint), Some(token)) = (
            config.nlp.as_ref(),
            config.nlp_extract_url(),
            config.credentials.access_token(),
        ) else {
            return Ok(None);
        };
        Self::new(client, &endpoint, token, nlp.language.clone()).map(Some)
    }
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    language: &'a str,
    expression: &'a str,
}

#[async_trait]
impl NlpExtractor for ReqwestNlpClient {
    async fn extract(&self, expression: &str) -> Result<NlpExtract, NlpError> {
        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.access_token)
            .json(&ExtractRequest {
                language: &self.language,
                expression,
            })
            .send()
            .await
            .map_err(|err| {
                record_counter(ERRORS_COUNTER, 1, &extract_labels(&[("kind", "transport")]));
                NlpError::Transport(err)
            })?;

        let status = response.status();
        record_histogram(
            ROUNDTRIP_HISTOGRAM,
            started.elapsed().as_secs_f64(),
            &extract_labels(&[("status", status.as_str())]),
        );

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".into());
            record_counter(
                ERRORS_COUNTER,
                1,
                &extract_labels(&[("kind", "remote"), ("status", status.as_str())]),
            );
            return Err(NlpError::Remote {
                status,
                message: body.chars().take(512).collect(),
            });
        }

        let raw: RawExtractResponse = response.json().await.map_err(|err| {
            record_counter(ERRORS_COUNTER, 1, &extract_labels(&[("kind", "decode")]));
            NlpError::Decode(err)
        })?;

        Ok(raw.into())
    }
}

fn extract_labels(extra: &[(&str, &str)]) -> TelemetryLabels {
    let mut labels = TelemetryLabels::new(CONNECTOR_NAME);
    labels.extra.push(("endpoint".into(), EXTRACT_ENDPOINT.into()));
    labels
        .extra
        .extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    labels
}

#[derive(Debug, Default, Deserialize)]
struct RawExtractResponse {
    #[serde(default)]
    extract: Option<RawExtract>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExtract {
    #[serde(default)]
    intents: Option<Vec<RawIntent>>,
    #[serde(default)]
    entities: Option<Vec<RawEntity>>,
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(default)]
    name: String,
    #[serde(default, alias = "score")]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: Value,
    #[serde(default, alias = "score")]
    confidence: Option<f64>,
}

impl From<RawExtractResponse> for NlpExtract {
    fn from(raw: RawExtractResponse) -> Self {
        let extract = raw.extract.unwrap_or_default();
        Self {
            intents: extract
                .intents
                .unwrap_or_default()
                .into_iter()
                .map(|i| IntentScore {
                    name: i.name,
                    confidence: i.confidence,
                })
                .collect(),
            entities: extract
                .entities
                .unwrap_or_default()
                .into_iter()
                .map(|e| NlpEntity {
                    name: e.name,
                    value: e.value,
                    confidence: e.confidence,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_intents_and_entities() {
        let raw: RawExtractResponse = serde_json::from_value(json!({
            "extract": {
                "intents": [
                    { "name": "order_pizza", "confidence": 0.91 },
                    { "name": "greet", "score": 0.05 }
                ],
                "entities": [
                    { "name": "size", "value": "large", "confidence": 0.8 }
                ]
            }
        }))
        .unwrap();
        let extract = NlpExtract::from(raw);
        assert_eq!(extract.intents.len(), 2);
        assert_eq!(extract.intents[1].confidence, Some(0.05));
        assert_eq!(extract.entities[0].value, json!("large"));
    }

    #[test]
    fn null_sections_are_empty() {
        let raw: RawExtractResponse =
            serde_json::from_value(json!({ "extract": { "intents": null } })).unwrap();
        assert_eq!(NlpExtract::from(raw), NlpExtract::default());

        let raw: RawExtractResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(NlpExtract::from(raw), NlpExtract::default());
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let err = ReqwestNlpClient::new(Client::new(), "not a url", "t", "en")
            .err()
            .expect("config error");
        assert!(matches!(err, NlpError::Config(_)));
    }

    #[test]
    fn metric_labels_carry_connector_and_endpoint() {
        let labels = extract_labels(&[("kind", "remote"), ("status", "500")]);
        assert_eq!(
            labels.tags(),
            vec![
                ("connector".to_string(), "chatlayer".to_string()),
                ("endpoint".to_string(), "nlp.extract".to_string()),
                ("kind".to_string(), "remote".to_string()),
                ("status".to_string(), "500".to_string()),
            ]
        );
    }
}

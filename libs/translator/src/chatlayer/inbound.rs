use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use clb_core::config::scalar_to_string;
use clb_core::{
    Button, Card, ConnectorCapabilities, ConnectorConfig, InboundMessage, NlpIntent, NlpResult,
    is_truthy,
};
use serde_json::{Value, json};
use tracing::{Instrument, debug, warn};

use crate::Decoder;
use crate::media::media_from_uri;
use crate::nlp::NlpExtractor;
use crate::telemetry::{Direction, record_transcoded, transcode_span};

/// Decodes Chatlayer webhook deliveries into bot replies.
///
/// Deliveries that fail verification, or carry an `event` message, decode
/// to `None`. Unsupported attachments are logged and dropped.
#[derive(Clone)]
pub struct ChatlayerDecoder {
    verify_token: String,
    capabilities: ConnectorCapabilities,
    nlp: Option<Arc<dyn NlpExtractor>>,
}

impl ChatlayerDecoder {
    pub fn new(verify_token: impl Into<String>, capabilities: ConnectorCapabilities) -> Self {
        Self {
            verify_token: verify_token.into(),
            capabilities,
            nlp: None,
        }
    }

    pub fn from_config(config: &ConnectorConfig) -> Self {
        Self::new(config.verify_token.clone(), config.capabilities)
    }

    pub fn with_nlp_extractor(mut self, extractor: Arc<dyn NlpExtractor>) -> Self {
        self.nlp = Some(extractor);
        self
    }

    /// Decodes without the enrichment call. The intent, when present, is the
    /// one delivered inline with the webhook.
    pub fn decode_basic(&self, payload: &Value) -> Option<InboundMessage> {
        let message = self.accepted_message(payload)?;

        let mut msg = InboundMessage {
            message_text: str_field(&message, "text"),
            ..InboundMessage::default()
        };

        msg.buttons
            .extend(items(&message, "quick_replies").map(map_button));

        if let Some(attachment) = message.get("attachment")
            && let Some(attachment_payload) = attachment.get("payload").filter(|p| is_truthy(p))
        {
            let kind = attachment
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default();
            self.decode_attachment(kind, attachment_payload, &mut msg);
        }

        msg.nlp = payload.get("nlp").and_then(basic_nlp);
        Some(msg)
    }

    fn accepted_message<'a>(&self, payload: &'a Value) -> Option<Cow<'a, Value>> {
        let verified = payload
            .get("verifyToken")
            .and_then(scalar_to_string)
            .is_some_and(|token| token == self.verify_token);
        if !verified {
            debug!("verify token mismatch; ignoring webhook");
            return None;
        }

        let message = match (payload.get("message"), payload.get("text")) {
            (Some(message @ Value::Object(_)), _) => Cow::Borrowed(message),
            (_, Some(Value::String(text))) => Cow::Owned(json!({ "text": text })),
            _ => {
                debug!("webhook carries no message");
                return None;
            }
        };

        if message.get("type").and_then(Value::as_str) == Some("event") {
            debug!("ignoring event webhook");
            return None;
        }
        Some(message)
    }

    fn decode_attachment(&self, kind: &str, payload: &Value, msg: &mut InboundMessage) {
        match kind {
            "image" | "video" if self.capabilities.media => {
                match payload.get("url").and_then(Value::as_str) {
                    Some(url) => msg.media.push(media_from_uri(url)),
                    None => debug!(attachment_type = kind, "attachment has no url"),
                }
            }
            "template" => self.decode_template(payload, msg),
            other => debug!(
                attachment_type = other,
                "the attachment type is not supported yet"
            ),
        }
    }

    fn decode_template(&self, payload: &Value, msg: &mut InboundMessage) {
        let template_type = payload
            .get("template_type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match template_type {
            "button" => {
                msg.message_text = str_field(payload, "text");
                msg.buttons.extend(items(payload, "buttons").map(map_button));
            }
            "list" | "generic" if self.capabilities.cards => {
                msg.cards.extend(items(payload, "elements").map(map_card));
            }
            other => debug!(template_type = other, "the template type is not supported yet"),
        }
    }

    async fn enrich(&self, expression: &str, basic: NlpResult) -> NlpResult {
        let Some(extractor) = self.nlp.as_ref().filter(|_| self.capabilities.nlp_enrichment)
        else {
            return basic;
        };

        match extractor.extract(expression).await {
            Ok(extract) => NlpResult {
                intent: NlpIntent {
                    intents: extract.intents,
                    ..basic.intent
                },
                entities: extract.entities,
            },
            Err(err) => {
                warn!(error = %err, "nlp enrichment failed; keeping inline intent");
                NlpResult {
                    intent: basic.intent,
                    entities: Vec::new(),
                }
            }
        }
    }
}

#[async_trait]
impl Decoder for ChatlayerDecoder {
    async fn decode(&self, payload: &Value) -> Option<InboundMessage> {
        let span = transcode_span(Direction::Inbound, conversation_id_of(payload));
        async {
            let Some(mut msg) = self.decode_basic(payload) else {
                record_transcoded(Direction::Inbound, "ignored");
                return None;
            };
            if let Some(basic) = msg.nlp.take() {
                msg.nlp = Some(self.enrich(&msg.message_text, basic).await);
            }
            record_transcoded(Direction::Inbound, "decoded");
            Some(msg)
        }
        .instrument(span)
        .await
    }
}

/// Maps a quick reply or template button.
///
/// Plain strings become label-only buttons; objects use `title` and the
/// `payload` (or `url`) value, parsed as JSON when possible.
pub fn map_button(entry: &Value) -> Button {
    match entry {
        Value::String(text) => Button::new(text.clone(), None),
        other => {
            let raw = other
                .get("payload")
                .filter(|p| is_truthy(p))
                .or_else(|| other.get("url"));
            Button::new(str_field(other, "title"), raw.and_then(parse_button_payload))
        }
    }
}

pub fn map_card(element: &Value) -> Card {
    Card {
        text: str_field(element, "title"),
        content: str_field(element, "subtitle"),
        media: element
            .get("image_url")
            .and_then(Value::as_str)
            .map(|url| vec![media_from_uri(url)])
            .unwrap_or_default(),
        buttons: items(element, "buttons").map(map_button).collect(),
    }
}

/// Strings are parsed as JSON and kept raw when that fails; other values pass through.
pub fn parse_button_payload(raw: &Value) -> Option<Value> {
    match raw {
        Value::Null => None,
        Value::String(text) => {
            Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone())))
        }
        other => Some(other.clone()),
    }
}

fn basic_nlp(nlp: &Value) -> Option<NlpResult> {
    let intent = nlp.get("intent")?;
    let name = intent
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())?;
    Some(NlpResult {
        intent: NlpIntent {
            name: name.to_string(),
            confidence: intent.get("score").and_then(Value::as_f64),
            intents: Vec::new(),
        },
        entities: Vec::new(),
    })
}

fn conversation_id_of(payload: &Value) -> Option<&str> {
    payload
        .get("senderId")
        .and_then(Value::as_str)
        .or_else(|| payload.pointer("/sender/id").and_then(Value::as_str))
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn items<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> + use<'a> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

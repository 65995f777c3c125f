use std::borrow::Cow;

use clb_core::{Button, ConnectorConfig, OutboundMessage, is_truthy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::Encoder;
use crate::telemetry::{Direction, record_transcoded, transcode_with_span};

/// Body POSTed to the channel webhook for one user turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    pub conversation_id: String,
    pub message: RequestMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_data: Option<Value>,
}

/// The message slot. At most one field is set; none is set for media turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_message: Option<IntroMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postback_message: Option<PostbackMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_message: Option<TextMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntroMessage {}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostbackMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_dialogstate_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_data_to_set: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Encodes user turns into Chatlayer webhook bodies.
///
/// ```
/// use clb_core::OutboundMessage;
/// use clb_translator::{ChatlayerEncoder, Encoder};
/// use serde_json::json;
///
/// let encoder = ChatlayerEncoder::new(Some(json!({"locale": "en"})));
/// let body = encoder.encode("conv-1", &OutboundMessage::text("hello"));
/// assert_eq!(
///     serde_json::to_value(&body).unwrap(),
///     json!({
///         "conversationId": "conv-1",
///         "message": { "textMessage": { "text": "hello" } },
///         "sessionData": { "locale": "en" }
///     })
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChatlayerEncoder {
    session_data: Option<Value>,
}

impl ChatlayerEncoder {
    pub fn new(session_data: Option<Value>) -> Self {
        Self { session_data }
    }

    pub fn from_config(config: &ConnectorConfig) -> Self {
        Self::new(config.session_data.clone())
    }

    /// Picks the single message kind for a turn: intro, postback, media, text.
    pub fn encode_message(&self, msg: &OutboundMessage) -> RequestMessage {
        if msg.intro_message {
            return RequestMessage {
                intro_message: Some(IntroMessage {}),
                ..RequestMessage::default()
            };
        }

        if let Some(button) = msg.buttons.first()
            && button.is_actionable()
        {
            return RequestMessage {
                postback_message: Some(postback_for(button)),
                ..RequestMessage::default()
            };
        }

        if !msg.media.is_empty() {
            // Chatlayer has no inbound media message; the slot is left empty on purpose.
            debug!(count = msg.media.len(), "media messages are not supported yet");
            return RequestMessage::default();
        }

        RequestMessage {
            text_message: Some(TextMessage {
                text: msg.message_text.clone(),
            }),
            ..RequestMessage::default()
        }
    }
}

impl Encoder for ChatlayerEncoder {
    fn encode(&self, conversation_id: &str, msg: &OutboundMessage) -> RequestBody {
        transcode_with_span(Direction::Outbound, Some(conversation_id), || {
            let body = RequestBody {
                conversation_id: conversation_id.to_string(),
                message: self.encode_message(msg),
                session_data: self.session_data.clone(),
            };
            record_transcoded(Direction::Outbound, "encoded");
            body
        })
    }

    fn apply(&self, body: &mut Value, msg: &OutboundMessage) {
        let conversation_id = body
            .get("conversationId")
            .and_then(Value::as_str)
            .map(str::to_string);
        transcode_with_span(Direction::Outbound, conversation_id.as_deref(), || {
            if !body.is_object() {
                warn!("request body template is not a JSON object; replacing it");
                *body = Value::Object(Map::new());
            }
            let Some(obj) = body.as_object_mut() else {
                return;
            };

            if let Some(session_data) = &self.session_data {
                obj.insert("sessionData".into(), session_data.clone());
            }

            let slot = obj
                .entry("message")
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }

            match serde_json::to_value(self.encode_message(msg)) {
                Ok(Value::Object(fields)) => {
                    if let Some(slot) = slot.as_object_mut() {
                        slot.extend(fields);
                    }
                    record_transcoded(Direction::Outbound, "encoded");
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "failed to serialize request message"),
            }
        })
    }
}

fn postback_for(button: &Button) -> PostbackMessage {
    let mut postback = PostbackMessage {
        title: (!button.text.is_empty()).then(|| button.text.clone()),
        ..PostbackMessage::default()
    };

    if let Some(payload) = button.payload.as_ref().filter(|p| is_truthy(p)) {
        match parse_postback_payload(payload) {
            Ok(parsed) => {
                postback.next_dialogstate_id = parsed.get("nextDialogstateId").cloned();
                postback.session_data_to_set = parsed.get("parameters").cloned();
            }
            Err(err) => debug!(error = %err, "the button payload can not be parsed"),
        }
    }

    postback
}

/// Objects are used as-is, strings are parsed as JSON.
fn parse_postback_payload(payload: &Value) -> Result<Cow<'_, Value>, serde_json::Error> {
    match payload {
        Value::String(raw) => serde_json::from_str(raw).map(Cow::Owned),
        other => Ok(Cow::Borrowed(other)),
    }
}

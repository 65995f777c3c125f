use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Mime type reported for media whose URI has no recognizable extension.
pub const UNKNOWN_MIME_TYPE: &str = "application/unknown";

/// A user turn handed to the connector by the test framework.
///
/// At most one kind is encoded per turn; see the encoder for the priority
/// between intro markers, buttons, media and text.
///
/// ```
/// use clb_core::OutboundMessage;
///
/// let msg: OutboundMessage =
///     serde_json::from_value(serde_json::json!({ "introMessage": {} })).unwrap();
/// assert!(msg.intro_message);
/// assert!(msg.buttons.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_text: Option<String>,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub media: Vec<Media>,
    /// Accepts any truthy JSON value; frameworks commonly send `{}`.
    #[serde(default, deserialize_with = "deserialize_truthy")]
    pub intro_message: bool,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            message_text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn intro() -> Self {
        Self {
            intro_message: true,
            ..Self::default()
        }
    }

    pub fn button(text: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            buttons: vec![Button::new(text, payload)],
            ..Self::default()
        }
    }
}

/// A clickable button or quick reply.
///
/// `payload` is kept as loosely typed JSON: it may be a parsed object, a raw
/// string that did not parse, or `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Button {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl Button {
    pub fn new(text: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            text: text.into(),
            payload,
        }
    }

    /// True when the button has a label or a truthy payload. `""`, `0` and
    /// `false` payloads do not count.
    pub fn is_actionable(&self) -> bool {
        !self.text.is_empty() || self.payload.as_ref().is_some_and(is_truthy)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default)]
    pub media_uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Card {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

/// A decoded bot reply.
///
/// Every list is always present, so consumers only ever check for emptiness.
///
/// ```
/// use clb_core::InboundMessage;
///
/// let msg = InboundMessage::default();
/// let json = serde_json::to_value(&msg).unwrap();
/// assert_eq!(json["buttons"], serde_json::json!([]));
/// assert!(json.get("nlp").is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    #[serde(default)]
    pub message_text: String,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nlp: Option<NlpResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NlpResult {
    pub intent: NlpIntent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<NlpEntity>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NlpIntent {
    pub name: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Ranked alternatives, only filled by the enrichment call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intents: Vec<IntentScore>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntentScore {
    pub name: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NlpEntity {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// JavaScript-style truthiness for loosely typed flags.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn deserialize_truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(is_truthy(&value))
}

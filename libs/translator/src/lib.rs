//! Transcoding between the test framework's message model and the Chatlayer
//! channel webhook API.
//!
//! The entry points are the [`Encoder`] and [`Decoder`] traits, implemented by
//! [`ChatlayerEncoder`] and [`ChatlayerDecoder`]. [`Connector`] wires both into
//! the hooks and settings a generic REST transport container expects.

use async_trait::async_trait;
use clb_core::{InboundMessage, OutboundMessage};
use serde_json::Value;

pub mod chatlayer;
pub mod connector;
pub mod media;
pub mod nlp;
pub mod telemetry;

pub use chatlayer::{ChatlayerDecoder, ChatlayerEncoder, RequestBody, RequestMessage};
pub use connector::{Connector, InboundSelector, PingSettings, RestSettings};
pub use nlp::{NlpError, NlpExtract, NlpExtractor, ReqwestNlpClient};

/// Converts a user turn into the platform request body.
///
/// Encoding never fails: malformed pieces of the turn are logged and left out.
pub trait Encoder: Send + Sync {
    fn encode(&self, conversation_id: &str, msg: &OutboundMessage) -> RequestBody;

    /// Fills a body template supplied by the transport in place.
    fn apply(&self, body: &mut Value, msg: &OutboundMessage);
}

/// Converts a webhook delivery into a bot reply, or `None` when the delivery
/// is not a message for this connector.
#[async_trait]
pub trait Decoder: Send + Sync {
    async fn decode(&self, payload: &Value) -> Option<InboundMessage>;
}

use clb_telemetry::{
    MessageContext, TelemetryLabels, record_counter, telemetry_enabled, with_common_fields,
};
use tracing::Span;

const TRANSCODE_SPAN_NAME: &str = "transcode.run";
const TRANSCODE_COUNTER: &str = "messages_transcoded";
pub(crate) const CONNECTOR_NAME: &str = "chatlayer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
        }
    }
}

pub fn transcode_span(direction: Direction, conversation_id: Option<&str>) -> Span {
    let span = tracing::info_span!(
        TRANSCODE_SPAN_NAME,
        connector = tracing::field::Empty,
        conversation_id = tracing::field::Empty,
        direction = %direction.as_str()
    );
    with_common_fields(&span, CONNECTOR_NAME, conversation_id);
    span
}

pub fn transcode_with_span<T, F>(direction: Direction, conversation_id: Option<&str>, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = transcode_span(direction, conversation_id);
    let _guard = span.enter();
    f()
}

/// Counts a finished transcode; `outcome` is e.g. `encoded`, `decoded` or `ignored`.
pub fn record_transcoded(direction: Direction, outcome: &str) {
    if !telemetry_enabled() {
        return;
    }
    let mut labels = TelemetryLabels::new(CONNECTOR_NAME).with_direction(direction.as_str());
    labels.extra.push(("outcome".into(), outcome.to_string()));
    let ctx = MessageContext::new(labels);
    record_counter(TRANSCODE_COUNTER, 1, &ctx.labels);
}

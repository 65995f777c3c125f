use std::sync::atomic::{AtomicBool, Ordering};

use metrics::Label;
use tracing::Span;

use crate::context::TelemetryLabels;

static METRICS_ENABLED: AtomicBool = AtomicBool::new(false);

pub(crate) fn set_metrics_enabled(enabled: bool) {
    METRICS_ENABLED.store(enabled, Ordering::SeqCst);
}

pub fn telemetry_enabled() -> bool {
    METRICS_ENABLED.load(Ordering::SeqCst)
}

pub fn with_common_fields(span: &Span, connector: &str, conversation_id: Option<&str>) {
    span.record("connector", tracing::field::display(connector));
    if let Some(conversation_id) = conversation_id {
        span.record("conversation_id", tracing::field::display(conversation_id));
    }
}

fn to_labels(labels: &TelemetryLabels) -> Vec<Label> {
    labels
        .tags()
        .into_iter()
        .map(|(key, value)| Label::new(key, value))
        .collect()
}

pub fn record_counter(name: &'static str, value: u64, labels: &TelemetryLabels) {
    if !telemetry_enabled() {
        return;
    }
    metrics::counter!(name, to_labels(labels)).increment(value);
}

pub fn record_histogram(name: &'static str, value: f64, labels: &TelemetryLabels) {
    if !telemetry_enabled() {
        return;
    }
    metrics::histogram!(name, to_labels(labels)).record(value);
}

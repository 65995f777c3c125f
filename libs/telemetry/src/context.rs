#[derive(Debug, Clone)]
pub struct TelemetryLabels {
    pub connector: String,
    pub direction: Option<String>,
    pub conversation_id: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl TelemetryLabels {
    pub fn new(connector: impl Into<String>) -> Self {
        Self {
            connector: connector.into(),
            direction: None,
            conversation_id: None,
            extra: Vec::new(),
        }
    }

    pub fn with_direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    /// Labels suitable for metrics. The conversation id is left out to keep
    /// cardinality bounded.
    pub fn tags(&self) -> Vec<(String, String)> {
        let mut tags = Vec::with_capacity(2 + self.extra.len());
        tags.push(("connector".into(), self.connector.clone()));
        if let Some(direction) = &self.direction {
            tags.push(("direction".into(), direction.clone()));
        }
        for (key, value) in &self.extra {
            tags.push((key.clone(), value.clone()));
        }
        tags
    }
}

#[derive(Debug, Clone)]
pub struct MessageContext {
    pub labels: TelemetryLabels,
}

impl MessageContext {
    pub fn new(labels: TelemetryLabels) -> Self {
        Self { labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_skip_conversation_id() {
        let mut labels = TelemetryLabels::new("chatlayer").with_direction("inbound");
        labels.conversation_id = Some("conv-1".into());
        labels.extra.push(("outcome".into(), "decoded".into()));

        let tags = labels.tags();
        assert_eq!(
            tags,
            vec![
                ("connector".to_string(), "chatlayer".to_string()),
                ("direction".to_string(), "inbound".to_string()),
                ("outcome".to_string(), "decoded".to_string()),
            ]
        );
    }
}

use serde::{Deserialize, Serialize};

/// Feature switches for the platform protocol revision being targeted.
///
/// Older webhook revisions only deliver text, quick replies and button
/// templates; later ones add media, list/generic cards and the NLU extract
/// endpoint.
///
/// ```
/// use clb_core::ConnectorCapabilities;
///
/// let caps = ConnectorCapabilities::basic();
/// assert!(!caps.cards);
/// assert!(ConnectorCapabilities::default().nlp_enrichment);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ConnectorCapabilities {
    /// Decode `image` and `video` attachments.
    pub media: bool,
    /// Decode `list` and `generic` templates into cards.
    pub cards: bool,
    /// Call the NLU extract endpoint for ranked intents and entities.
    pub nlp_enrichment: bool,
}

impl ConnectorCapabilities {
    pub fn full() -> Self {
        Self {
            media: true,
            cards: true,
            nlp_enrichment: true,
        }
    }

    pub fn basic() -> Self {
        Self {
            media: false,
            cards: false,
            nlp_enrichment: false,
        }
    }
}

impl Default for ConnectorCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

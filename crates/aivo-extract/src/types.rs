use aivo_core::records::{DetectionMethod, MentionContext, Sentiment};

/// A brand mention extracted from one answer, before the engine stamps the
/// run/provider identity fields onto it.
#[derive(Debug, Clone)]
pub struct ExtractedMention {
    /// Brand display name as configured.
    pub brand: String,
    /// Canonical dedup key; unique within one answer.
    pub normalized_key: String,
    pub is_mine: bool,
    pub rank_position: Option<u32>,
    pub rank_confidence: f64,
    pub confidence: f64,
    pub detection_method: DetectionMethod,
    pub sentiment: Option<Sentiment>,
    pub mention_context: Option<MentionContext>,
    /// Byte offset of the first occurrence in the answer text; `usize::MAX`
    /// when the text never contains the brand verbatim (LLM-only evidence).
    pub(crate) first_offset: usize,
}

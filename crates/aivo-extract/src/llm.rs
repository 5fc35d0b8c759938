//! Seam to the analysis LLM used for hybrid extraction, classification,
//! and operation calls.
//!
//! The trait keeps this crate free of HTTP concerns: the engine wires a
//! live client in, tests wire in scripted fakes.

use aivo_core::records::{MentionContext, Sentiment};
use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ExtractError;

/// A structured (JSON) completion with its attributed cost.
#[derive(Debug, Clone)]
pub struct LlmJson {
    pub value: serde_json::Value,
    pub cost_usd: f64,
}

/// A plain-text completion with its attributed cost.
#[derive(Debug, Clone)]
pub struct LlmText {
    pub text: String,
    pub model: String,
    pub cost_usd: f64,
}

/// Analysis-side LLM calls. Implementations must be safe to share across
/// concurrently executing units.
#[async_trait]
pub trait AnalysisLlm: Send + Sync {
    /// One structured call; the returned value is expected to be a JSON
    /// object matching the prompt's contract.
    async fn complete_json(&self, system: &str, user: &str) -> Result<LlmJson, ExtractError>;

    /// One plain-text call, optionally overriding the default model.
    async fn complete_text(
        &self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<LlmText, ExtractError>;
}

/// One row of the structured extraction contract, as the LLM returns it.
/// Enums arrive as free strings and are mapped tolerantly — an unknown
/// sentiment becomes `None`, not an error.
#[derive(Debug, Deserialize)]
pub struct LlmMentionRow {
    pub brand: String,
    #[serde(default)]
    pub rank_position: Option<u32>,
    pub confidence: f64,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub mention_context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LlmMentionEnvelope {
    mentions: Vec<serde_json::Value>,
}

/// Parses the extraction envelope, skipping malformed rows with a warning
/// rather than failing the whole payload.
///
/// # Errors
///
/// Returns [`ExtractError::MalformedOutput`] only when the envelope itself
/// (the top-level `mentions` array) is missing or mis-shaped.
pub fn parse_mention_rows(value: &serde_json::Value) -> Result<Vec<LlmMentionRow>, ExtractError> {
    let envelope: LlmMentionEnvelope = serde_json::from_value(value.clone())
        .map_err(|e| ExtractError::MalformedOutput(e.to_string()))?;

    Ok(envelope
        .mentions
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            serde_json::from_value::<LlmMentionRow>(row)
                .map_err(|e| {
                    tracing::warn!(index = i, error = %e, "skipping malformed extraction row");
                })
                .ok()
        })
        .collect())
}

/// Maps a free-string sentiment onto the closed enum, `None` if unknown.
#[must_use]
pub fn parse_sentiment(s: &str) -> Option<Sentiment> {
    match s.to_lowercase().as_str() {
        "positive" => Some(Sentiment::Positive),
        "neutral" => Some(Sentiment::Neutral),
        "negative" => Some(Sentiment::Negative),
        _ => None,
    }
}

/// Maps a free-string mention context onto the closed enum, `None` if
/// unknown.
#[must_use]
pub fn parse_mention_context(s: &str) -> Option<MentionContext> {
    match s.to_lowercase().as_str() {
        "recommendation" => Some(MentionContext::Recommendation),
        "comparison" => Some(MentionContext::Comparison),
        "example" => Some(MentionContext::Example),
        "warning" => Some(MentionContext::Warning),
        "other" => Some(MentionContext::Other),
        _ => None,
    }
}

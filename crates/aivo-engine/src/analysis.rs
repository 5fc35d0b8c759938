//! Live [`AnalysisLlm`] implementation over the shared chat client.
//!
//! Used for hybrid extraction, classification, and operation calls. The
//! structured path asks for JSON and parses it leniently (models love to
//! wrap JSON in code fences); costs come from the pricing table with the
//! usual missing-entry-is-zero rule.

use std::sync::Arc;

use aivo_core::{AppConfig, ConfigError, PricingTable};
use aivo_extract::{AnalysisLlm, ExtractError, LlmJson, LlmText};
use aivo_runners::LlmClient;
use async_trait::async_trait;

const ANALYSIS_MAX_TOKENS: u32 = 1_024;

/// Analysis backend speaking to a real chat-completion endpoint.
pub struct LiveAnalysisLlm {
    client: LlmClient,
    model: String,
    pricing: Arc<PricingTable>,
}

impl LiveAnalysisLlm {
    /// Builds the analysis backend from the app config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when no analysis API key is
    /// configured or the HTTP client cannot be constructed.
    pub fn from_app_config(
        config: &AppConfig,
        pricing: Arc<PricingTable>,
    ) -> Result<Self, ConfigError> {
        let api_key = config.analysis_api_key.as_deref().ok_or_else(|| {
            ConfigError::Validation(
                "AIVO_ANALYSIS_API_KEY is required for the configured extraction/classification features"
                    .to_owned(),
            )
        })?;

        let provider = infer_provider(&config.analysis_api_url);
        let client = LlmClient::new(
            provider,
            &config.analysis_api_url,
            api_key,
            config.request_timeout_secs,
        )
        .map_err(|e| ConfigError::Validation(format!("analysis client: {e}")))?;

        Ok(Self {
            client,
            model: config.analysis_model.clone(),
            pricing,
        })
    }

    fn cost_of(&self, model: &str, tokens_in: u64, tokens_out: u64) -> f64 {
        self.pricing
            .cost_usd(self.client.provider(), model, tokens_in, tokens_out)
            .unwrap_or(0.0)
    }
}

#[async_trait]
impl AnalysisLlm for LiveAnalysisLlm {
    async fn complete_json(&self, system: &str, user: &str) -> Result<LlmJson, ExtractError> {
        let completion = self
            .client
            .complete(&self.model, Some(system), user, ANALYSIS_MAX_TOKENS)
            .await
            .map_err(|e| ExtractError::Llm(e.to_string()))?;

        let value = parse_lenient_json(&completion.text)
            .ok_or_else(|| ExtractError::MalformedOutput(truncate_for_log(&completion.text)))?;

        Ok(LlmJson {
            value,
            cost_usd: self.cost_of(&self.model, completion.tokens_in, completion.tokens_out),
        })
    }

    async fn complete_text(
        &self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<LlmText, ExtractError> {
        let model = model.unwrap_or(&self.model);
        let completion = self
            .client
            .complete(model, None, prompt, ANALYSIS_MAX_TOKENS)
            .await
            .map_err(|e| ExtractError::Llm(e.to_string()))?;

        Ok(LlmText {
            cost_usd: self.cost_of(model, completion.tokens_in, completion.tokens_out),
            text: completion.text,
            model: model.to_owned(),
        })
    }
}

fn infer_provider(api_url: &str) -> &'static str {
    if api_url.contains("anthropic.com") {
        "anthropic"
    } else if api_url.contains("perplexity.ai") {
        "perplexity"
    } else {
        "openai"
    }
}

/// Parses model output as JSON, tolerating code fences and surrounding
/// prose. Returns `None` when no object can be recovered.
fn parse_lenient_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let without_fences = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim);
    if let Some(inner) = without_fences {
        if let Ok(value) = serde_json::from_str(inner) {
            return Some(value);
        }
    }

    // Last resort: the outermost object embedded in prose.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

fn truncate_for_log(text: &str) -> String {
    let mut end = text.len().min(200);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_parses() {
        let value = parse_lenient_json(r#"{"mentions": []}"#).unwrap();
        assert!(value.get("mentions").is_some());
    }

    #[test]
    fn fenced_json_parses() {
        let value = parse_lenient_json("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn json_embedded_in_prose_parses() {
        let value = parse_lenient_json("Here you go: {\"a\": 1} hope that helps!").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_lenient_json("no json here").is_none());
        assert!(parse_lenient_json("{broken").is_none());
    }

    #[test]
    fn provider_inference() {
        assert_eq!(
            infer_provider("https://api.anthropic.com/v1/messages"),
            "anthropic"
        );
        assert_eq!(
            infer_provider("https://api.perplexity.ai/chat/completions"),
            "perplexity"
        );
        assert_eq!(infer_provider("https://gateway.internal/v1"), "openai");
    }
}

//! Direct chat-completion API runner.

use std::sync::Arc;

use aivo_core::{ConfigError, PricingTable, RunnerConfig};
use async_trait::async_trait;

use crate::error::RunnerError;
use crate::llm::LlmClient;
use crate::registry::RunnerContext;
use crate::types::IntentResult;
use crate::Runner;

const DEFAULT_MAX_TOKENS: u32 = 2_048;

/// Runner that sends the intent prompt straight to a chat-completion API.
///
/// Required options: `provider`, `model`, `api_key`. Optional: `api_url`
/// (defaulted for known providers), `max_tokens`, `system_prompt`.
#[derive(Debug)]
pub struct ApiRunner {
    name: String,
    model: String,
    max_tokens: u32,
    system_prompt: Option<String>,
    client: LlmClient,
    pricing: Arc<PricingTable>,
}

impl ApiRunner {
    /// Builds an API runner from its validated options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PluginConfig`] when a required option is
    /// missing, the provider has no default endpoint and `api_url` is
    /// absent, or the HTTP client cannot be constructed.
    pub fn from_config(
        config: &RunnerConfig,
        context: &RunnerContext,
    ) -> Result<Self, ConfigError> {
        let provider = config.require_str("provider")?;
        let model = config.require_str("model")?;
        let api_key = config.require_str("api_key")?;

        let api_url = match config.get_str("api_url") {
            Some(url) => url.to_owned(),
            None => default_api_url(provider).ok_or_else(|| ConfigError::PluginConfig {
                plugin: config.plugin.clone(),
                reason: format!("no default endpoint for provider '{provider}'; set api_url"),
            })?,
        };

        let max_tokens = match config.options.get("max_tokens") {
            None => DEFAULT_MAX_TOKENS,
            Some(v) => {
                u32::try_from(v.as_u64().ok_or_else(|| ConfigError::PluginConfig {
                    plugin: config.plugin.clone(),
                    reason: "max_tokens must be a positive integer".to_owned(),
                })?)
                .map_err(|_| ConfigError::PluginConfig {
                    plugin: config.plugin.clone(),
                    reason: "max_tokens out of range".to_owned(),
                })?
            }
        };

        let client = LlmClient::new(provider, &api_url, api_key, context.request_timeout_secs)
            .map_err(|e| ConfigError::PluginConfig {
                plugin: config.plugin.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            name: config.name.clone(),
            model: model.to_owned(),
            max_tokens,
            system_prompt: config.get_str("system_prompt").map(str::to_owned),
            client,
            pricing: Arc::clone(&context.pricing),
        })
    }
}

#[async_trait]
impl Runner for ApiRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn runner_type(&self) -> &'static str {
        "api"
    }

    /// Rough pre-flight estimate: ~4 characters per input token, half the
    /// response cap as expected output.
    #[allow(clippy::cast_possible_truncation)]
    fn estimate_cost_usd(&self, prompt: &str) -> f64 {
        let est_in = (prompt.len() / 4) as u64;
        let est_out = u64::from(self.max_tokens / 2);
        self.pricing
            .cost_usd(self.client.provider(), &self.model, est_in, est_out)
            .unwrap_or(0.0)
    }

    async fn run_intent(&self, prompt: &str) -> Result<IntentResult, RunnerError> {
        let completion = self
            .client
            .complete(
                &self.model,
                self.system_prompt.as_deref(),
                prompt,
                self.max_tokens,
            )
            .await?;

        let provider = self.client.provider().to_owned();
        let cost_usd = self
            .pricing
            .cost_usd(
                &provider,
                &self.model,
                completion.tokens_in,
                completion.tokens_out,
            )
            .unwrap_or_else(|| {
                tracing::warn!(
                    provider = %provider,
                    model = %self.model,
                    "no pricing entry — recording zero cost"
                );
                0.0
            });

        Ok(IntentResult {
            provider,
            model: self.model.clone(),
            answer_text: completion.text,
            tokens_in: completion.tokens_in,
            tokens_out: completion.tokens_out,
            cost_usd,
            screenshot_path: None,
            session_id: None,
        })
    }
}

fn default_api_url(provider: &str) -> Option<String> {
    match provider {
        "openai" => Some("https://api.openai.com/v1/chat/completions".to_owned()),
        "anthropic" => Some("https://api.anthropic.com/v1/messages".to_owned()),
        "perplexity" => Some("https://api.perplexity.ai/chat/completions".to_owned()),
        _ => None,
    }
}

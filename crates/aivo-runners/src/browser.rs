//! Browser-automation bridge runner.
//!
//! The DOM navigation, login handling, and screenshot capture live in an
//! external bridge service; this runner only consumes its uniform HTTP
//! contract: `POST {bridge_url}/v1/run` with the provider and prompt,
//! answer text plus optional artifacts back.

use std::time::Duration;

use aivo_core::{ConfigError, RunnerConfig};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::RunnerError;
use crate::registry::RunnerContext;
use crate::types::IntentResult;
use crate::Runner;

/// Runner that executes intents through a browser-automation bridge.
///
/// Required options: `bridge_url`, `provider`. Optional: `model` (label
/// recorded on answers, default `web`), `cost_per_query_usd` (flat cost
/// per executed intent — browser surfaces report no token usage).
#[derive(Debug)]
pub struct BrowserRunner {
    name: String,
    provider: String,
    model: String,
    cost_per_query_usd: f64,
    bridge_url: String,
    client: Client,
}

impl BrowserRunner {
    /// Builds a browser runner from its validated options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PluginConfig`] when a required option is
    /// missing or the HTTP client cannot be constructed.
    pub fn from_config(
        config: &RunnerConfig,
        context: &RunnerContext,
    ) -> Result<Self, ConfigError> {
        let bridge_url = config.require_str("bridge_url")?;
        let provider = config.require_str("provider")?;

        let cost_per_query_usd = match config.options.get("cost_per_query_usd") {
            None => 0.0,
            Some(v) => v.as_f64().ok_or_else(|| ConfigError::PluginConfig {
                plugin: config.plugin.clone(),
                reason: "cost_per_query_usd must be a number".to_owned(),
            })?,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(context.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("aivo/0.1 (ai-visibility)")
            .build()
            .map_err(|e| ConfigError::PluginConfig {
                plugin: config.plugin.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            name: config.name.clone(),
            provider: provider.to_owned(),
            model: config.get_str("model").unwrap_or("web").to_owned(),
            cost_per_query_usd,
            bridge_url: bridge_url.trim_end_matches('/').to_owned(),
            client,
        })
    }
}

#[async_trait]
impl Runner for BrowserRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn runner_type(&self) -> &'static str {
        "browser"
    }

    fn estimate_cost_usd(&self, _prompt: &str) -> f64 {
        self.cost_per_query_usd
    }

    async fn run_intent(&self, prompt: &str) -> Result<IntentResult, RunnerError> {
        let url = format!("{}/v1/run", self.bridge_url);
        let request = BridgeRequest {
            provider: &self.provider,
            prompt,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RunnerError::Auth {
                    provider: self.provider.clone(),
                },
                StatusCode::TOO_MANY_REQUESTS => RunnerError::RateLimited {
                    provider: self.provider.clone(),
                    message,
                },
                s if s.is_server_error() => RunnerError::Server {
                    provider: self.provider.clone(),
                    status: s.as_u16(),
                },
                _ => RunnerError::BadRequest {
                    provider: self.provider.clone(),
                    message,
                },
            });
        }

        let body: BridgeResponse =
            response
                .json()
                .await
                .map_err(|e| RunnerError::InvalidResponse {
                    provider: self.provider.clone(),
                    reason: e.to_string(),
                })?;

        if body.answer_text.trim().is_empty() {
            return Err(RunnerError::InvalidResponse {
                provider: self.provider.clone(),
                reason: "bridge returned an empty answer".to_owned(),
            });
        }

        Ok(IntentResult {
            provider: self.provider.clone(),
            model: self.model.clone(),
            answer_text: body.answer_text,
            tokens_in: 0,
            tokens_out: 0,
            cost_usd: self.cost_per_query_usd,
            screenshot_path: body.screenshot_path,
            session_id: body.session_id,
        })
    }
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    provider: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct BridgeResponse {
    answer_text: String,
    #[serde(default)]
    screenshot_path: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aivo_core::PricingTable;

    use super::*;

    fn context() -> RunnerContext {
        RunnerContext {
            pricing: Arc::new(PricingTable::builtin()),
            request_timeout_secs: 5,
        }
    }

    fn config(options: serde_json::Value) -> RunnerConfig {
        serde_json::from_value(serde_json::json!({
            "name": "perplexity-web",
            "plugin": "browser",
            "options": options,
        }))
        .unwrap()
    }

    #[test]
    fn missing_bridge_url_is_a_config_error() {
        let cfg = config(serde_json::json!({ "provider": "perplexity" }));
        let err = BrowserRunner::from_config(&cfg, &context()).unwrap_err();
        assert!(matches!(err, ConfigError::PluginConfig { .. }));
    }

    #[test]
    fn trailing_slash_on_bridge_url_is_normalised() {
        let cfg = config(serde_json::json!({
            "provider": "perplexity",
            "bridge_url": "http://localhost:8900/",
        }));
        let runner = BrowserRunner::from_config(&cfg, &context()).unwrap();
        assert_eq!(runner.bridge_url, "http://localhost:8900");
    }

    #[test]
    fn non_numeric_cost_is_rejected() {
        let cfg = config(serde_json::json!({
            "provider": "perplexity",
            "bridge_url": "http://localhost:8900",
            "cost_per_query_usd": "free",
        }));
        assert!(BrowserRunner::from_config(&cfg, &context()).is_err());
    }
}

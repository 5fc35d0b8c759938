//! Chat-completion HTTP client shared by the API runner and the analysis
//! stages (extraction, classification, operations).
//!
//! Speaks both the OpenAI-compatible and the Anthropic messages formats;
//! the format is detected from the endpoint URL. HTTP status codes are
//! mapped onto the transient/permanent [`RunnerError`] taxonomy so the
//! retry policy can classify failures without inspecting provider payloads.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::RunnerError;

/// Wire format of the configured endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    Anthropic,
    OpenAi,
}

/// One completed chat call: the text plus the token usage the backend
/// reported (zero when the backend omits usage).
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

/// Chat-completion client bound to one endpoint and key.
#[derive(Debug)]
pub struct LlmClient {
    client: Client,
    api_url: String,
    api_key: String,
    provider: String,
    format: ApiFormat,
}

impl LlmClient {
    /// Creates a client for the given endpoint.
    ///
    /// `provider` labels errors and pricing lookups; the wire format is
    /// detected from the URL (anthropic.com → Anthropic messages,
    /// everything else → OpenAI-compatible).
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        provider: &str,
        api_url: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, RunnerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("aivo/0.1 (ai-visibility)")
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.to_owned(),
            api_key: api_key.to_owned(),
            provider: provider.to_owned(),
            format: Self::detect_format(api_url),
        })
    }

    fn detect_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            // OpenAI, Perplexity, DeepSeek, and most gateways speak the
            // OpenAI chat-completions format.
            ApiFormat::OpenAi
        }
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    #[must_use]
    pub fn format(&self) -> ApiFormat {
        self.format
    }

    /// Sends one chat completion request.
    ///
    /// # Errors
    ///
    /// - [`RunnerError::Auth`] on HTTP 401/403.
    /// - [`RunnerError::RateLimited`] on HTTP 429.
    /// - [`RunnerError::BadRequest`] on other 4xx.
    /// - [`RunnerError::Server`] on 5xx.
    /// - [`RunnerError::Http`] on network failure.
    /// - [`RunnerError::InvalidResponse`] if the body shape is unexpected.
    pub async fn complete(
        &self,
        model: &str,
        system: Option<&str>,
        user: &str,
        max_tokens: u32,
    ) -> Result<Completion, RunnerError> {
        match self.format {
            ApiFormat::Anthropic => self.complete_anthropic(model, system, user, max_tokens).await,
            ApiFormat::OpenAi => self.complete_openai(model, system, user, max_tokens).await,
        }
    }

    async fn complete_anthropic(
        &self,
        model: &str,
        system: Option<&str>,
        user: &str,
        max_tokens: u32,
    ) -> Result<Completion, RunnerError> {
        let request = AnthropicRequest {
            model,
            max_tokens,
            system,
            messages: vec![WireMessage {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?;

        let response = self.check_status(response).await?;

        let body: AnthropicResponse =
            response
                .json()
                .await
                .map_err(|e| RunnerError::InvalidResponse {
                    provider: self.provider.clone(),
                    reason: e.to_string(),
                })?;

        let text = body
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or_else(|| RunnerError::InvalidResponse {
                provider: self.provider.clone(),
                reason: "no text content block".to_owned(),
            })?;

        Ok(Completion {
            text,
            tokens_in: body.usage.input_tokens,
            tokens_out: body.usage.output_tokens,
        })
    }

    async fn complete_openai(
        &self,
        model: &str,
        system: Option<&str>,
        user: &str,
        max_tokens: u32,
    ) -> Result<Completion, RunnerError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(WireMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: user,
        });

        let request = OpenAiRequest {
            model,
            max_tokens,
            messages,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let response = self.check_status(response).await?;

        let body: OpenAiResponse =
            response
                .json()
                .await
                .map_err(|e| RunnerError::InvalidResponse {
                    provider: self.provider.clone(),
                    reason: e.to_string(),
                })?;

        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RunnerError::InvalidResponse {
                provider: self.provider.clone(),
                reason: "empty choices array".to_owned(),
            })?;

        Ok(Completion {
            text,
            tokens_in: body.usage.prompt_tokens,
            tokens_out: body.usage.completion_tokens,
        })
    }

    /// Maps non-2xx statuses onto the error taxonomy, consuming the body
    /// for the error message where useful.
    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RunnerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        let message = truncate(&message, 500);

        Err(match status {
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
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_owned()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_format_detected_from_url() {
        assert_eq!(
            LlmClient::detect_format("https://api.anthropic.com/v1/messages"),
            ApiFormat::Anthropic
        );
    }

    #[test]
    fn openai_format_is_the_default() {
        assert_eq!(
            LlmClient::detect_format("https://api.openai.com/v1/chat/completions"),
            ApiFormat::OpenAi
        );
        assert_eq!(
            LlmClient::detect_format("https://api.perplexity.ai/chat/completions"),
            ApiFormat::OpenAi
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo wörld";
        let t = truncate(s, 3);
        assert!(t.starts_with("h"));
        assert!(t.ends_with('…'));
        assert_eq!(truncate("short", 500), "short");
    }
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Budget;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Mention extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Regex detector only; no extraction LLM calls.
    Regex,
    /// Always invoke the structured LLM extractor.
    FunctionCalling,
    /// Regex first; LLM extractor only when regex coverage is weak.
    Hybrid,
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub intents_path: PathBuf,
    pub brands_path: PathBuf,
    pub runners_path: PathBuf,
    pub pricing_path: Option<PathBuf>,
    pub classification_cache_path: Option<PathBuf>,
    pub budget: Budget,
    pub request_timeout_secs: u64,
    pub max_concurrent_units: usize,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub extraction_method: ExtractionMethod,
    /// Mentions from the LLM extractor below this confidence are discarded.
    pub min_confidence: f64,
    /// Fraction of tracked brands regex must find before hybrid mode
    /// skips the LLM extractor.
    pub regex_coverage_floor: f64,
    pub classify_enabled: bool,
    pub sentiment_enabled: bool,
    /// Endpoint, key, and default model for extraction/classification/
    /// operation calls (distinct from the runners being measured).
    pub analysis_api_url: String,
    pub analysis_api_key: Option<String>,
    pub analysis_model: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("intents_path", &self.intents_path)
            .field("brands_path", &self.brands_path)
            .field("runners_path", &self.runners_path)
            .field("pricing_path", &self.pricing_path)
            .field(
                "classification_cache_path",
                &self.classification_cache_path,
            )
            .field("budget", &self.budget)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_concurrent_units", &self.max_concurrent_units)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("extraction_method", &self.extraction_method)
            .field("min_confidence", &self.min_confidence)
            .field("regex_coverage_floor", &self.regex_coverage_floor)
            .field("classify_enabled", &self.classify_enabled)
            .field("sentiment_enabled", &self.sentiment_enabled)
            .field("analysis_api_url", &self.analysis_api_url)
            .field(
                "analysis_api_key",
                &self.analysis_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("analysis_model", &self.analysis_model)
            .finish()
    }
}

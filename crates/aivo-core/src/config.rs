use crate::app_config::{AppConfig, Environment, ExtractionMethod};
use crate::{Budget, ConfigError};

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` equivalent is left to the binary; this
/// function reads the process environment as-is.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in
/// the process.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup
/// function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<f64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected boolean, got '{other}'"),
            }),
        }
    };

    let env = parse_environment(&or_default("AIVO_ENV", "development"));
    let log_level = or_default("AIVO_LOG_LEVEL", "info");

    let intents_path = PathBuf::from(or_default("AIVO_INTENTS_PATH", "./config/intents.yaml"));
    let brands_path = PathBuf::from(or_default("AIVO_BRANDS_PATH", "./config/brands.yaml"));
    let runners_path = PathBuf::from(or_default("AIVO_RUNNERS_PATH", "./config/runners.yaml"));
    let pricing_path = lookup("AIVO_PRICING_PATH").ok().map(PathBuf::from);
    let classification_cache_path = lookup("AIVO_CLASSIFICATION_CACHE_PATH")
        .ok()
        .map(PathBuf::from);

    let budget = Budget {
        max_per_run_usd: parse_f64("AIVO_BUDGET_MAX_RUN_USD", "5.0")?,
        max_per_intent_usd: parse_f64("AIVO_BUDGET_MAX_INTENT_USD", "1.0")?,
        warn_threshold_usd: parse_f64("AIVO_BUDGET_WARN_USD", "4.0")?,
    };
    budget.validate()?;

    let request_timeout_secs = parse_u64("AIVO_REQUEST_TIMEOUT_SECS", "60")?;
    let max_concurrent_units = parse_usize("AIVO_MAX_CONCURRENT_UNITS", "4")?;
    let max_retries = parse_u32("AIVO_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("AIVO_RETRY_BACKOFF_BASE_MS", "1000")?;

    let extraction_method = parse_extraction_method(&or_default("AIVO_EXTRACTION_METHOD", "hybrid"))?;
    let min_confidence = parse_f64("AIVO_MIN_CONFIDENCE", "0.3")?;
    let regex_coverage_floor = parse_f64("AIVO_REGEX_COVERAGE_FLOOR", "0.5")?;

    let classify_enabled = parse_bool("AIVO_CLASSIFY_ENABLED", "true")?;
    let sentiment_enabled = parse_bool("AIVO_SENTIMENT_ENABLED", "true")?;

    let analysis_api_url = or_default(
        "AIVO_ANALYSIS_API_URL",
        "https://api.openai.com/v1/chat/completions",
    );
    let analysis_api_key = lookup("AIVO_ANALYSIS_API_KEY").ok();
    let analysis_model = or_default("AIVO_ANALYSIS_MODEL", "gpt-4o-mini");

    Ok(AppConfig {
        env,
        log_level,
        intents_path,
        brands_path,
        runners_path,
        pricing_path,
        classification_cache_path,
        budget,
        request_timeout_secs,
        max_concurrent_units,
        max_retries,
        retry_backoff_base_ms,
        extraction_method,
        min_confidence,
        regex_coverage_floor,
        classify_enabled,
        sentiment_enabled,
        analysis_api_url,
        analysis_api_key,
        analysis_model,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_extraction_method(s: &str) -> Result<ExtractionMethod, ConfigError> {
    match s {
        "regex" => Ok(ExtractionMethod::Regex),
        "function_calling" => Ok(ExtractionMethod::FunctionCalling),
        "hybrid" => Ok(ExtractionMethod::Hybrid),
        other => Err(ConfigError::InvalidEnvVar {
            var: "AIVO_EXTRACTION_METHOD".to_string(),
            reason: format!("expected regex|function_calling|hybrid, got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn defaults_apply_with_empty_env() {
        let map = HashMap::new();
        let config = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(config.env, Environment::Development);
        assert_eq!(config.max_concurrent_units, 4);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.extraction_method, ExtractionMethod::Hybrid);
        assert!(config.analysis_api_key.is_none());
        assert!((config.budget.max_per_run_usd - 5.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_extraction_method_is_rejected() {
        let mut map = HashMap::new();
        map.insert("AIVO_EXTRACTION_METHOD", "psychic");
        let err = build_app_config(lookup_from_map(&map)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn invalid_budget_is_rejected() {
        let mut map = HashMap::new();
        map.insert("AIVO_BUDGET_MAX_RUN_USD", "0");
        let err = build_app_config(lookup_from_map(&map)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn invalid_bool_is_rejected() {
        let mut map = HashMap::new();
        map.insert("AIVO_CLASSIFY_ENABLED", "maybe");
        let err = build_app_config(lookup_from_map(&map)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let mut map = HashMap::new();
        map.insert("AIVO_ENV", "production");
        map.insert("AIVO_MAX_CONCURRENT_UNITS", "8");
        map.insert("AIVO_EXTRACTION_METHOD", "regex");
        map.insert("AIVO_ANALYSIS_API_KEY", "sk-test");
        let config = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(config.env, Environment::Production);
        assert_eq!(config.max_concurrent_units, 8);
        assert_eq!(config.extraction_method, ExtractionMethod::Regex);
        assert_eq!(config.analysis_api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut map = HashMap::new();
        map.insert("AIVO_ANALYSIS_API_KEY", "sk-secret");
        let config = build_app_config(lookup_from_map(&map)).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[redacted]"));
    }
}

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// One configured execution backend: a unique name, the plugin that
/// implements it, and an opaque options map the plugin validates at
/// creation time. Secrets are already resolved by the time this struct
/// exists.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    pub name: String,
    pub plugin: String,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl RunnerConfig {
    /// Fetch a required string option, or a `PluginConfig` error naming it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::PluginConfig` if the key is absent or not a string.
    pub fn require_str(&self, key: &str) -> Result<&str, ConfigError> {
        self.options
            .get(key)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ConfigError::PluginConfig {
                plugin: self.plugin.clone(),
                reason: format!("missing required string option '{key}'"),
            })
    }

    /// Fetch an optional string option.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunnersFile {
    pub runners: Vec<RunnerConfig>,
}

/// Load and validate the runners configuration from a YAML file.
///
/// Plugin-specific option schemas are validated later, by the plugin
/// factory itself; this loader only checks structural invariants.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_runners(path: &Path) -> Result<RunnersFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let runners_file: RunnersFile =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::FileParse {
            path: path.display().to_string(),
            source: e,
        })?;

    validate_runners(&runners_file)?;

    Ok(runners_file)
}

fn validate_runners(runners_file: &RunnersFile) -> Result<(), ConfigError> {
    if runners_file.runners.is_empty() {
        return Err(ConfigError::Validation(
            "runners file declares no runners".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for runner in &runners_file.runners {
        if runner.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "runner name must be non-empty".to_string(),
            ));
        }
        if runner.plugin.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "runner '{}' has an empty plugin name",
                runner.name
            )));
        }
        if !seen.insert(runner.name.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate runner name: '{}'",
                runner.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(name: &str, plugin: &str) -> RunnerConfig {
        RunnerConfig {
            name: name.to_string(),
            plugin: plugin.to_string(),
            options: serde_json::Map::new(),
        }
    }

    #[test]
    fn unique_runners_pass() {
        let file = RunnersFile {
            runners: vec![runner("openai", "api"), runner("perplexity-web", "browser")],
        };
        assert!(validate_runners(&file).is_ok());
    }

    #[test]
    fn duplicate_runner_name_is_rejected() {
        let file = RunnersFile {
            runners: vec![runner("openai", "api"), runner("openai", "api")],
        };
        assert!(validate_runners(&file).is_err());
    }

    #[test]
    fn require_str_reports_missing_key() {
        let r = runner("openai", "api");
        let err = r.require_str("api_key").unwrap_err();
        assert!(matches!(err, ConfigError::PluginConfig { .. }));
    }

    #[test]
    fn require_str_returns_present_value() {
        let mut r = runner("openai", "api");
        r.options.insert(
            "api_key".to_string(),
            serde_json::Value::String("sk-test".to_string()),
        );
        assert_eq!(r.require_str("api_key").unwrap(), "sk-test");
    }
}

//! Name-keyed registry of runner plugins.
//!
//! Factories validate the runner's options map at creation time, so a
//! misconfigured runner is a [`ConfigError`] before any execution starts.

use std::collections::HashMap;
use std::sync::Arc;

use aivo_core::{ConfigError, PricingTable, RunnerConfig};

use crate::api::ApiRunner;
use crate::browser::BrowserRunner;
use crate::Runner;

/// Shared construction context handed to every factory.
pub struct RunnerContext {
    pub pricing: Arc<PricingTable>,
    pub request_timeout_secs: u64,
}

type RunnerFactory =
    Box<dyn Fn(&RunnerConfig, &RunnerContext) -> Result<Box<dyn Runner>, ConfigError> + Send + Sync>;

/// Maps plugin names to runner constructors.
#[derive(Default)]
pub struct RunnerRegistry {
    factories: HashMap<String, RunnerFactory>,
}

impl RunnerRegistry {
    /// Empty registry; register plugins explicitly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in `api` and `browser` plugins.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("api", |config, context| {
            Ok(Box::new(ApiRunner::from_config(config, context)?))
        });
        registry.register("browser", |config, context| {
            Ok(Box::new(BrowserRunner::from_config(config, context)?))
        });
        registry
    }

    /// Registers a factory under a plugin name, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&RunnerConfig, &RunnerContext) -> Result<Box<dyn Runner>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.to_owned(), Box::new(factory));
    }

    /// Creates a runner for the given configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownPlugin`] if no factory is registered under
    ///   `config.plugin`.
    /// - [`ConfigError::PluginConfig`] if the options map fails the
    ///   plugin's schema validation.
    pub fn create(
        &self,
        config: &RunnerConfig,
        context: &RunnerContext,
    ) -> Result<Box<dyn Runner>, ConfigError> {
        let factory = self
            .factories
            .get(&config.plugin)
            .ok_or_else(|| ConfigError::UnknownPlugin(config.plugin.clone()))?;
        factory(config, context)
    }

    /// Plugin names currently registered, for diagnostics.
    #[must_use]
    pub fn plugin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RunnerContext {
        RunnerContext {
            pricing: Arc::new(PricingTable::builtin()),
            request_timeout_secs: 5,
        }
    }

    fn config(plugin: &str, options: serde_json::Value) -> RunnerConfig {
        serde_json::from_value(serde_json::json!({
            "name": "r1",
            "plugin": plugin,
            "options": options,
        }))
        .unwrap()
    }

    #[test]
    fn unknown_plugin_is_rejected() {
        let registry = RunnerRegistry::with_builtins();
        let err = registry
            .create(&config("carrier-pigeon", serde_json::json!({})), &context())
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlugin(_)));
    }

    #[test]
    fn builtin_api_plugin_creates_runner() {
        let registry = RunnerRegistry::with_builtins();
        let runner = registry
            .create(
                &config(
                    "api",
                    serde_json::json!({
                        "provider": "openai",
                        "model": "gpt-4o",
                        "api_key": "k",
                    }),
                ),
                &context(),
            )
            .unwrap();
        assert_eq!(runner.runner_type(), "api");
    }

    #[test]
    fn invalid_options_surface_before_any_call() {
        let registry = RunnerRegistry::with_builtins();
        let err = registry
            .create(&config("api", serde_json::json!({})), &context())
            .unwrap_err();
        assert!(matches!(err, ConfigError::PluginConfig { .. }));
    }

    #[test]
    fn custom_plugin_can_be_registered() {
        let mut registry = RunnerRegistry::new();
        registry.register("api", |config, context| {
            Ok(Box::new(ApiRunner::from_config(config, context)?))
        });
        assert_eq!(registry.plugin_names(), vec!["api"]);
    }
}

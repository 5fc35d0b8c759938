use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal: a run aborts with status `configuration_error`
/// before any execution unit starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file could not be read from disk.
    #[error("failed to read {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed as YAML.
    #[error("failed to parse {path}: {source}")]
    FileParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required environment variable is not set.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable is set but its value cannot be parsed.
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    /// Semantic validation of loaded configuration failed.
    #[error("configuration validation failed: {0}")]
    Validation(String),

    /// A runner references a plugin name with no registered factory.
    #[error("unknown runner plugin: '{0}'")]
    UnknownPlugin(String),

    /// A runner's options map does not match the plugin's expected schema.
    #[error("invalid config for runner plugin '{plugin}': {reason}")]
    PluginConfig { plugin: String, reason: String },

    /// An operation depends on an operation id not declared in the same intent.
    #[error("operation '{operation_id}' in intent '{intent_id}' depends on undeclared operation '{missing}'")]
    UnknownDependency {
        intent_id: String,
        operation_id: String,
        missing: String,
    },

    /// The operation dependency graph of an intent contains a cycle.
    #[error("operation dependency cycle in intent '{intent_id}' involving {remaining:?}")]
    DependencyCycle {
        intent_id: String,
        remaining: Vec<String>,
    },

    /// An operation template references a placeholder outside its declared context.
    #[error("operation '{operation_id}' in intent '{intent_id}' references unavailable placeholder '{{{placeholder}}}'")]
    UnknownPlaceholder {
        intent_id: String,
        operation_id: String,
        placeholder: String,
    },
}

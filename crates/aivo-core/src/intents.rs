use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A secondary LLM analysis call attached to an intent.
///
/// `prompt_template` may reference `{intent_prompt}`, `{intent_response}`,
/// `{my_rank}`, `{competitors}`, and `{dep:<id>}` for each id listed in
/// `depends_on`. Placeholder resolution is validated before any execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSpec {
    pub id: String,
    pub prompt_template: String,
    /// Model override for this operation; `None` uses the analysis default.
    pub model: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// A configured natural-language query sent to every runner, plus its
/// post-processing operations. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentsFile {
    pub intents: Vec<Intent>,
}

/// Load and validate the intents configuration from a YAML file.
///
/// Uniqueness of intent ids, per-intent uniqueness of operation ids, and
/// resolvability of every `depends_on` reference are checked here. Cycle
/// detection runs in the operation graph validator before execution.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_intents(path: &Path) -> Result<IntentsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let intents_file: IntentsFile =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::FileParse {
            path: path.display().to_string(),
            source: e,
        })?;

    validate_intents(&intents_file)?;

    Ok(intents_file)
}

fn validate_intents(intents_file: &IntentsFile) -> Result<(), ConfigError> {
    if intents_file.intents.is_empty() {
        return Err(ConfigError::Validation(
            "intents file declares no intents".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();

    for intent in &intents_file.intents {
        if intent.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "intent id must be non-empty".to_string(),
            ));
        }
        if intent.prompt.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "intent '{}' has an empty prompt",
                intent.id
            )));
        }
        if !seen_ids.insert(intent.id.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate intent id: '{}'",
                intent.id
            )));
        }

        let mut op_ids = HashSet::new();
        for op in &intent.operations {
            if op.id.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "intent '{}' has an operation with an empty id",
                    intent.id
                )));
            }
            if !op_ids.insert(op.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate operation id '{}' in intent '{}'",
                    op.id, intent.id
                )));
            }
        }

        for op in &intent.operations {
            for dep in &op.depends_on {
                if dep == &op.id {
                    return Err(ConfigError::Validation(format!(
                        "operation '{}' in intent '{}' depends on itself",
                        op.id, intent.id
                    )));
                }
                if !op_ids.contains(dep.as_str()) {
                    return Err(ConfigError::UnknownDependency {
                        intent_id: intent.id.clone(),
                        operation_id: op.id.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

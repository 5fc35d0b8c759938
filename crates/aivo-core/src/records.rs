//! Write-once record shapes produced by a run and handed to persistence.
//!
//! Identity keys documented on each type mirror what the external storage
//! collaborator deduplicates on; the engine guarantees at most one record
//! per key per run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialFailure,
    CompleteFailure,
    BudgetExceeded,
    ConfigurationError,
}

impl RunStatus {
    /// Process exit code the CLI maps this status to.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::PartialFailure => 2,
            RunStatus::CompleteFailure => 3,
            RunStatus::BudgetExceeded => 4,
            RunStatus::ConfigurationError => 5,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Success => "success",
            RunStatus::PartialFailure => "partial_failure",
            RunStatus::CompleteFailure => "complete_failure",
            RunStatus::BudgetExceeded => "budget_exceeded",
            RunStatus::ConfigurationError => "configuration_error",
        };
        write!(f, "{s}")
    }
}

/// One backend's raw response to one intent.
///
/// Identity key: `(run_id, intent_id, provider, model, runner_type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAnswer {
    pub run_id: Uuid,
    pub intent_id: String,
    pub provider: String,
    pub model: String,
    /// Plugin name of the runner that produced this answer (`api`, `browser`).
    pub runner_type: String,
    pub answer_text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
    pub screenshot_path: Option<String>,
    pub session_id: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// How a mention was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Regex,
    FunctionCalling,
}

/// Sentiment of a single brand mention within one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// The role a mention plays in the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionContext {
    Recommendation,
    Comparison,
    Example,
    Warning,
    Other,
}

/// A detected brand occurrence within one answer, deduplicated by
/// normalized brand key.
///
/// Identity key: `(run_id, intent_id, provider, model, normalized_key)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    pub run_id: Uuid,
    pub intent_id: String,
    pub provider: String,
    pub model: String,
    /// Brand display name as configured.
    pub brand: String,
    /// Canonical dedup key (lowercased, TLD-stripped, whitespace-collapsed).
    pub normalized_key: String,
    pub is_mine: bool,
    pub rank_position: Option<u32>,
    /// Confidence in the rank assignment, distinct from mention confidence:
    /// explicit ordinal markers score higher than order-of-appearance.
    pub rank_confidence: f64,
    pub confidence: f64,
    pub detection_method: DetectionMethod,
    pub sentiment: Option<Sentiment>,
    pub mention_context: Option<MentionContext>,
}

/// Cached classification of one intent prompt.
///
/// Keyed globally by `query_hash`; written at most once per hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassification {
    pub query_hash: String,
    pub intent_type: String,
    pub buyer_stage: String,
    pub urgency_signal: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// Outcome of one operation in an intent's dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Succeeded,
    Failed,
    /// Not executed because a dependency failed or was itself skipped, or
    /// because the budget ran out first.
    Skipped,
}

/// Result of one secondary analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    pub run_id: Uuid,
    pub intent_id: String,
    pub operation_id: String,
    pub status: OperationStatus,
    pub output: Option<String>,
    pub model: String,
    pub cost_usd: f64,
    pub error: Option<String>,
}

/// An auditable failure entry attached to the run summary. Unit failures
/// carry the runner name; operation failures carry the operation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    pub intent_id: String,
    pub runner: Option<String>,
    pub operation_id: Option<String>,
    pub message: String,
}

/// Final accounting for one run. Produced exactly once, immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub total_cost_usd: f64,
    pub queries_completed: u32,
    pub queries_failed: u32,
    pub warnings: Vec<String>,
    pub errors: Vec<RunError>,
}

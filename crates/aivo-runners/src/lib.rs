//! Execution backends for AIVO.
//!
//! Every backend — a direct chat-completion API or a browser-automation
//! bridge — implements the single [`Runner`] contract: execute one intent
//! prompt, return an [`IntentResult`] or a typed [`RunnerError`]. The
//! [`RunnerRegistry`] maps plugin names to factories and validates runner
//! options at creation time, so misconfiguration fails before any network
//! call.

pub mod api;
pub mod browser;
pub mod llm;
pub mod registry;
pub mod retry;

mod error;
mod types;

use async_trait::async_trait;

pub use error::RunnerError;
pub use llm::{ApiFormat, Completion, LlmClient};
pub use registry::{RunnerContext, RunnerRegistry};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use types::IntentResult;

/// A single execution backend bound to one configured runner.
///
/// Implementations must never panic across this boundary; all failures
/// surface as [`RunnerError`] values the orchestrator records per unit.
#[async_trait]
pub trait Runner: Send + Sync + std::fmt::Debug {
    /// Configured runner name (unique per run).
    fn name(&self) -> &str;

    /// Plugin name this runner was created from (`api`, `browser`).
    fn runner_type(&self) -> &'static str;

    /// Expected cost of executing `prompt`, used by the pre-flight budget
    /// gate before any network call. Unknown pricing estimates as zero.
    fn estimate_cost_usd(&self, prompt: &str) -> f64;

    /// Execute one intent prompt against the backend.
    async fn run_intent(&self, prompt: &str) -> Result<IntentResult, RunnerError>;
}

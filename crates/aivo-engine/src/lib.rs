//! Execution engine for AIVO.
//!
//! Composes runners, extraction, classification, and the operation DAG
//! executor into one run: fan intents out across configured backends with
//! bounded concurrency, enforce the budget before and during execution,
//! retry transient backend failures, and aggregate a final, auditable
//! [`aivo_core::RunSummary`].

pub mod analysis;
pub mod cost;
pub mod dag;
pub mod orchestrator;
pub mod persist;
pub mod render;

mod error;
mod unit;

pub use analysis::LiveAnalysisLlm;
pub use cost::{CostTracker, CostVerdict};
pub use error::EngineError;
pub use orchestrator::{Orchestrator, RunRequest};
pub use persist::{MemorySink, RunSink};
pub use unit::ExecutionUnit;

//! Seam to the external persistence collaborator.
//!
//! The engine hands records over keyed by their identity fields and moves
//! on; durable storage, upsert semantics, and reporting live outside this
//! crate. Implementations own their failure handling — a sink that cannot
//! write logs and degrades rather than failing the run.

use std::sync::Mutex;

use aivo_core::records::{IntentClassification, Mention, OperationResult, RawAnswer, RunSummary};

/// Receives every record a run produces.
pub trait RunSink: Send + Sync {
    fn record_raw_answer(&self, answer: &RawAnswer);
    fn record_mentions(&self, mentions: &[Mention]);
    fn record_classification(&self, classification: &IntentClassification);
    fn record_operation_results(&self, results: &[OperationResult]);
    fn record_summary(&self, summary: &RunSummary);
}

/// In-memory sink used by tests and as the CLI default.
#[derive(Default)]
pub struct MemorySink {
    raw_answers: Mutex<Vec<RawAnswer>>,
    mentions: Mutex<Vec<Mention>>,
    classifications: Mutex<Vec<IntentClassification>>,
    operation_results: Mutex<Vec<OperationResult>>,
    summaries: Mutex<Vec<RunSummary>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn raw_answers(&self) -> Vec<RawAnswer> {
        self.raw_answers.lock().expect("sink lock poisoned").clone()
    }

    #[must_use]
    pub fn mentions(&self) -> Vec<Mention> {
        self.mentions.lock().expect("sink lock poisoned").clone()
    }

    #[must_use]
    pub fn classifications(&self) -> Vec<IntentClassification> {
        self.classifications
            .lock()
            .expect("sink lock poisoned")
            .clone()
    }

    #[must_use]
    pub fn operation_results(&self) -> Vec<OperationResult> {
        self.operation_results
            .lock()
            .expect("sink lock poisoned")
            .clone()
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<RunSummary> {
        self.summaries.lock().expect("sink lock poisoned").clone()
    }
}

impl RunSink for MemorySink {
    fn record_raw_answer(&self, answer: &RawAnswer) {
        self.raw_answers
            .lock()
            .expect("sink lock poisoned")
            .push(answer.clone());
    }

    fn record_mentions(&self, mentions: &[Mention]) {
        self.mentions
            .lock()
            .expect("sink lock poisoned")
            .extend_from_slice(mentions);
    }

    fn record_classification(&self, classification: &IntentClassification) {
        self.classifications
            .lock()
            .expect("sink lock poisoned")
            .push(classification.clone());
    }

    fn record_operation_results(&self, results: &[OperationResult]) {
        self.operation_results
            .lock()
            .expect("sink lock poisoned")
            .extend_from_slice(results);
    }

    fn record_summary(&self, summary: &RunSummary) {
        self.summaries
            .lock()
            .expect("sink lock poisoned")
            .push(summary.clone());
    }
}

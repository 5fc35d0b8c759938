use std::sync::Arc;

use aivo_core::Intent;
use aivo_runners::Runner;

/// One (intent × runner) pairing, created per run and consumed once.
pub struct ExecutionUnit {
    pub intent: Arc<Intent>,
    pub runner: Arc<dyn Runner>,
}

/// Builds the full fan-out: every intent against every runner.
#[must_use]
pub fn build_units(intents: &[Arc<Intent>], runners: &[Arc<dyn Runner>]) -> Vec<ExecutionUnit> {
    let mut units = Vec::with_capacity(intents.len() * runners.len());
    for intent in intents {
        for runner in runners {
            units.push(ExecutionUnit {
                intent: Arc::clone(intent),
                runner: Arc::clone(runner),
            });
        }
    }
    units
}

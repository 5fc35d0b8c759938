//! Run- and intent-scoped cost accounting.
//!
//! One tracker per run; it is the only state shared across concurrently
//! executing units, and every update goes through its internal lock so
//! concurrent completions cannot lose spend.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use aivo_core::Budget;

/// Outcome of recording one cost entry against the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostVerdict {
    WithinBudget,
    /// The owning intent crossed `max_per_intent_usd`; its remaining work
    /// is skipped but the run continues.
    IntentExceeded,
    /// The run crossed `max_per_run_usd`; all not-yet-started work is
    /// cancelled.
    RunExceeded,
}

struct CostState {
    run_total: f64,
    per_intent: HashMap<String, f64>,
    exhausted_intents: HashSet<String>,
    warn_fired: bool,
    warnings: Vec<String>,
    warned_pricing: HashSet<(String, String)>,
}

/// Accumulates actual spend and answers budget questions.
pub struct CostTracker {
    budget: Budget,
    state: Mutex<CostState>,
}

impl CostTracker {
    #[must_use]
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            state: Mutex::new(CostState {
                run_total: 0.0,
                per_intent: HashMap::new(),
                exhausted_intents: HashSet::new(),
                warn_fired: false,
                warnings: Vec::new(),
                warned_pricing: HashSet::new(),
            }),
        }
    }

    /// Pre-flight gate: would the estimated total already blow the run
    /// ceiling? Called once, before any network call.
    #[must_use]
    pub fn preflight_ok(&self, estimated_total_usd: f64) -> bool {
        estimated_total_usd <= self.budget.max_per_run_usd
    }

    /// Adds a completed call's cost to both scopes and reports the verdict.
    pub fn record(&self, intent_id: &str, cost_usd: f64) -> CostVerdict {
        let mut state = self.state.lock().expect("cost tracker lock poisoned");
        state.run_total += cost_usd;
        let intent_total = state
            .per_intent
            .entry(intent_id.to_owned())
            .and_modify(|t| *t += cost_usd)
            .or_insert(cost_usd);
        let intent_total = *intent_total;

        if !state.warn_fired && state.run_total >= self.budget.warn_threshold_usd {
            state.warn_fired = true;
            tracing::warn!(
                run_total_usd = state.run_total,
                warn_threshold_usd = self.budget.warn_threshold_usd,
                "run cost crossed the warn threshold"
            );
            let run_total = state.run_total;
            state.warnings.push(format!(
                "run cost ${:.4} crossed warn threshold ${:.4}",
                run_total, self.budget.warn_threshold_usd
            ));
        }

        if state.run_total > self.budget.max_per_run_usd {
            return CostVerdict::RunExceeded;
        }
        if intent_total > self.budget.max_per_intent_usd {
            state.exhausted_intents.insert(intent_id.to_owned());
            return CostVerdict::IntentExceeded;
        }
        CostVerdict::WithinBudget
    }

    /// Whether the intent has already crossed its ceiling.
    #[must_use]
    pub fn intent_exhausted(&self, intent_id: &str) -> bool {
        self.state
            .lock()
            .expect("cost tracker lock poisoned")
            .exhausted_intents
            .contains(intent_id)
    }

    /// Records a missing-pricing warning once per `(provider, model)`.
    pub fn warn_missing_pricing(&self, provider: &str, model: &str) {
        let mut state = self.state.lock().expect("cost tracker lock poisoned");
        let key = (provider.to_owned(), model.to_owned());
        if state.warned_pricing.insert(key) {
            tracing::warn!(provider, model, "no pricing entry — cost recorded as zero");
            state
                .warnings
                .push(format!("no pricing entry for {provider}/{model}"));
        }
    }

    pub fn record_warning(&self, message: String) {
        self.state
            .lock()
            .expect("cost tracker lock poisoned")
            .warnings
            .push(message);
    }

    #[must_use]
    pub fn total_usd(&self) -> f64 {
        self.state
            .lock()
            .expect("cost tracker lock poisoned")
            .run_total
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("cost tracker lock poisoned")
            .warnings
            .clone()
    }
}

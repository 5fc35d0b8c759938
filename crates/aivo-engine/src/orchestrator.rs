//! Run orchestration: fan intents out across runners, enforce the budget,
//! and aggregate the summary.
//!
//! The fan-out is a bounded concurrent pool with no ordering guarantee
//! across units. Cancellation (budget exhaustion) prevents not-yet-started
//! units from running; in-flight calls finish, their spend is recorded,
//! but their results are excluded from success accounting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aivo_core::records::{Mention, RawAnswer, RunError, RunStatus, RunSummary};
use aivo_core::{Budget, BrandsFile, ConfigError, Intent, PricingTable, RunnerConfig};
use aivo_extract::{
    classify_intent, AnalysisLlm, ClassificationCache, ExtractionConfig, ExtractionEngine,
};
use aivo_runners::{retry_with_backoff, RetryPolicy, Runner, RunnerContext, RunnerRegistry};
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use crate::cost::{CostTracker, CostVerdict};
use crate::dag::{execute_operations, validate_operations};
use crate::error::EngineError;
use crate::persist::RunSink;
use crate::unit::{build_units, ExecutionUnit};

/// Everything one run consumes, fully resolved by the caller.
pub struct RunRequest {
    pub intents: Vec<Intent>,
    pub runners: Vec<RunnerConfig>,
    pub brands: BrandsFile,
    pub budget: Budget,
    pub max_concurrent_units: usize,
    pub retry: RetryPolicy,
    pub extraction: ExtractionConfig,
    pub classify_enabled: bool,
    pub request_timeout_secs: u64,
}

/// Composes runners, extraction, classification, and operations into runs.
pub struct Orchestrator {
    registry: RunnerRegistry,
    pricing: Arc<PricingTable>,
    sink: Arc<dyn RunSink>,
    cache: Arc<dyn ClassificationCache>,
    analysis: Option<Arc<dyn AnalysisLlm>>,
}

enum UnitOutcome {
    Completed,
    Failed(String),
    /// Cancelled before start, intent budget exhausted, or finished after
    /// run cancellation — excluded from success accounting either way.
    Skipped,
}

struct UnitReport {
    intent_id: String,
    runner_name: String,
    outcome: UnitOutcome,
    operation_errors: Vec<RunError>,
}

struct RunScope<'a> {
    run_id: Uuid,
    engine: &'a ExtractionEngine,
    layers: &'a HashMap<String, Vec<Vec<usize>>>,
    competitors: &'a [String],
    tracker: &'a CostTracker,
    cancelled: &'a AtomicBool,
    retry: RetryPolicy,
    classify_enabled: bool,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        registry: RunnerRegistry,
        pricing: Arc<PricingTable>,
        sink: Arc<dyn RunSink>,
        cache: Arc<dyn ClassificationCache>,
        analysis: Option<Arc<dyn AnalysisLlm>>,
    ) -> Self {
        Self {
            registry,
            pricing,
            sink,
            cache,
            analysis,
        }
    }

    /// Executes one full run.
    ///
    /// Always produces a [`RunSummary`] — including for a pre-flight
    /// budget abort — except when configuration validation fails, which
    /// yields [`EngineError::Config`] before any network call.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for invalid budgets, unknown
    /// plugins, bad runner options, or invalid operation graphs.
    pub async fn execute(&self, request: &RunRequest) -> Result<RunSummary, EngineError> {
        let run_id = Uuid::new_v4();
        request.budget.validate()?;

        let engine = ExtractionEngine::new(&request.brands, request.extraction)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        let mut layers: HashMap<String, Vec<Vec<usize>>> = HashMap::new();
        for intent in &request.intents {
            layers.insert(intent.id.clone(), validate_operations(intent)?);
        }

        let runner_context = RunnerContext {
            pricing: Arc::clone(&self.pricing),
            request_timeout_secs: request.request_timeout_secs,
        };
        let mut runners: Vec<Arc<dyn Runner>> = Vec::with_capacity(request.runners.len());
        for config in &request.runners {
            runners.push(Arc::from(self.registry.create(config, &runner_context)?));
        }

        let intents: Vec<Arc<Intent>> = request.intents.iter().cloned().map(Arc::new).collect();
        let units = build_units(&intents, &runners);

        let tracker = CostTracker::new(request.budget);
        let estimated: f64 = units
            .iter()
            .map(|u| u.runner.estimate_cost_usd(&u.intent.prompt))
            .sum();
        tracing::info!(
            run_id = %run_id,
            units = units.len(),
            estimated_cost_usd = estimated,
            "starting run"
        );

        if !tracker.preflight_ok(estimated) {
            tracing::error!(
                estimated_cost_usd = estimated,
                max_per_run_usd = request.budget.max_per_run_usd,
                "pre-flight estimate exceeds the run budget — nothing executed"
            );
            let summary = RunSummary {
                run_id,
                status: RunStatus::BudgetExceeded,
                total_cost_usd: 0.0,
                queries_completed: 0,
                queries_failed: 0,
                warnings: vec![format!(
                    "pre-flight estimate ${estimated:.4} exceeds max_per_run_usd ${:.4}",
                    request.budget.max_per_run_usd
                )],
                errors: Vec::new(),
            };
            self.sink.record_summary(&summary);
            return Ok(summary);
        }

        let cancelled = AtomicBool::new(false);
        let competitors = request.brands.competitor_names();
        let scope = RunScope {
            run_id,
            engine: &engine,
            layers: &layers,
            competitors: &competitors,
            tracker: &tracker,
            cancelled: &cancelled,
            retry: request.retry,
            classify_enabled: request.classify_enabled,
        };

        let reports: Vec<UnitReport> = stream::iter(units)
            .map(|unit| self.process_unit(&scope, unit))
            .buffer_unordered(request.max_concurrent_units.max(1))
            .collect()
            .await;

        let summary = self.finalize(run_id, &tracker, &cancelled, reports);
        self.sink.record_summary(&summary);
        Ok(summary)
    }

    async fn process_unit(&self, scope: &RunScope<'_>, unit: ExecutionUnit) -> UnitReport {
        let intent = Arc::clone(&unit.intent);
        let runner_name = unit.runner.name().to_owned();

        if scope.cancelled.load(Ordering::SeqCst) || scope.tracker.intent_exhausted(&intent.id) {
            tracing::debug!(intent = %intent.id, runner = %runner_name, "unit skipped");
            return UnitReport {
                intent_id: intent.id.clone(),
                runner_name,
                outcome: UnitOutcome::Skipped,
                operation_errors: Vec::new(),
            };
        }

        let result = retry_with_backoff(scope.retry, || unit.runner.run_intent(&intent.prompt)).await;

        let answer = match result {
            Err(e) => {
                tracing::error!(
                    intent = %intent.id,
                    runner = %runner_name,
                    error = %e,
                    "unit failed"
                );
                return UnitReport {
                    intent_id: intent.id.clone(),
                    runner_name,
                    outcome: UnitOutcome::Failed(e.to_string()),
                    operation_errors: Vec::new(),
                };
            }
            Ok(answer) => answer,
        };

        // Spend is real even if this result ends up excluded, so account
        // for it before anything else. A unit whose own cost crosses the
        // ceiling still counts as completed; only later units are cut.
        let was_cancelled = scope.cancelled.load(Ordering::SeqCst);
        self.record_cost(scope, &intent.id, answer.cost_usd);
        if answer.tokens_in + answer.tokens_out > 0
            && self.pricing.lookup(&answer.provider, &answer.model).is_none()
        {
            scope
                .tracker
                .warn_missing_pricing(&answer.provider, &answer.model);
        }
        if was_cancelled {
            tracing::warn!(
                intent = %intent.id,
                runner = %runner_name,
                "unit finished after cancellation — result excluded"
            );
            return UnitReport {
                intent_id: intent.id.clone(),
                runner_name,
                outcome: UnitOutcome::Skipped,
                operation_errors: Vec::new(),
            };
        }

        let raw = RawAnswer {
            run_id: scope.run_id,
            intent_id: intent.id.clone(),
            provider: answer.provider.clone(),
            model: answer.model.clone(),
            runner_type: unit.runner.runner_type().to_owned(),
            answer_text: answer.answer_text.clone(),
            tokens_in: answer.tokens_in,
            tokens_out: answer.tokens_out,
            cost_usd: answer.cost_usd,
            screenshot_path: answer.screenshot_path.clone(),
            session_id: answer.session_id.clone(),
            captured_at: chrono::Utc::now(),
        };
        self.sink.record_raw_answer(&raw);

        let extraction = scope
            .engine
            .extract(&answer.answer_text, self.analysis.as_deref())
            .await;
        if extraction.llm_cost_usd > 0.0 {
            self.record_cost(scope, &intent.id, extraction.llm_cost_usd);
        }

        let mentions: Vec<Mention> = extraction
            .mentions
            .iter()
            .map(|m| Mention {
                run_id: scope.run_id,
                intent_id: intent.id.clone(),
                provider: answer.provider.clone(),
                model: answer.model.clone(),
                brand: m.brand.clone(),
                normalized_key: m.normalized_key.clone(),
                is_mine: m.is_mine,
                rank_position: m.rank_position,
                rank_confidence: m.rank_confidence,
                confidence: m.confidence,
                detection_method: m.detection_method,
                sentiment: m.sentiment,
                mention_context: m.mention_context,
            })
            .collect();
        self.sink.record_mentions(&mentions);
        let my_rank = mentions
            .iter()
            .find(|m| m.is_mine)
            .and_then(|m| m.rank_position);

        if scope.classify_enabled {
            if let Some(llm) = self.analysis.as_deref() {
                match classify_intent(llm, self.cache.as_ref(), &intent.prompt).await {
                    Ok((classification, cost_usd, from_cache)) => {
                        if cost_usd > 0.0 {
                            self.record_cost(scope, &intent.id, cost_usd);
                        }
                        if !from_cache {
                            self.sink.record_classification(&classification);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            intent = %intent.id,
                            error = %e,
                            "classification failed — continuing without it"
                        );
                    }
                }
            }
        }

        let mut operation_errors = Vec::new();
        if !intent.operations.is_empty() {
            if let Some(llm) = self.analysis.as_deref() {
                let layers = scope
                    .layers
                    .get(&intent.id)
                    .expect("layers validated for every intent");
                let results = execute_operations(
                    scope.run_id,
                    &intent,
                    layers,
                    &answer.answer_text,
                    my_rank,
                    scope.competitors,
                    llm,
                    scope.tracker,
                    scope.cancelled,
                )
                .await;
                operation_errors.extend(results.iter().filter_map(|r| {
                    r.error.as_ref().map(|message| RunError {
                        intent_id: intent.id.clone(),
                        runner: None,
                        operation_id: Some(r.operation_id.clone()),
                        message: message.clone(),
                    })
                }));
                self.sink.record_operation_results(&results);
            } else {
                tracing::warn!(
                    intent = %intent.id,
                    "operations configured but no analysis backend — skipped"
                );
            }
        }

        tracing::info!(
            intent = %intent.id,
            runner = %runner_name,
            cost_usd = answer.cost_usd,
            mentions = mentions.len(),
            "unit completed"
        );

        UnitReport {
            intent_id: intent.id.clone(),
            runner_name,
            outcome: UnitOutcome::Completed,
            operation_errors,
        }
    }

    /// Records a cost entry and flips the cancellation flag when the run
    /// ceiling is crossed.
    fn record_cost(&self, scope: &RunScope<'_>, intent_id: &str, cost_usd: f64) {
        match scope.tracker.record(intent_id, cost_usd) {
            CostVerdict::RunExceeded => {
                if !scope.cancelled.swap(true, Ordering::SeqCst) {
                    tracing::error!(
                        total_usd = scope.tracker.total_usd(),
                        "run budget exceeded — cancelling remaining units"
                    );
                }
            }
            CostVerdict::IntentExceeded => {
                tracing::warn!(
                    intent = %intent_id,
                    "intent budget exceeded — remaining work for it will be skipped"
                );
            }
            CostVerdict::WithinBudget => {}
        }
    }

    fn finalize(
        &self,
        run_id: Uuid,
        tracker: &CostTracker,
        cancelled: &AtomicBool,
        reports: Vec<UnitReport>,
    ) -> RunSummary {
        let mut completed = 0u32;
        let mut failed = 0u32;
        let mut skipped = 0u32;
        let mut errors: Vec<RunError> = Vec::new();

        for report in reports {
            match report.outcome {
                UnitOutcome::Completed => completed += 1,
                UnitOutcome::Skipped => skipped += 1,
                UnitOutcome::Failed(message) => {
                    failed += 1;
                    errors.push(RunError {
                        intent_id: report.intent_id.clone(),
                        runner: Some(report.runner_name.clone()),
                        operation_id: None,
                        message,
                    });
                }
            }
            errors.extend(report.operation_errors);
        }

        let status = if cancelled.load(Ordering::SeqCst) {
            RunStatus::BudgetExceeded
        } else if failed == 0 && skipped == 0 {
            RunStatus::Success
        } else if completed > 0 {
            RunStatus::PartialFailure
        } else {
            RunStatus::CompleteFailure
        };

        let summary = RunSummary {
            run_id,
            status,
            total_cost_usd: tracker.total_usd(),
            queries_completed: completed,
            queries_failed: failed,
            warnings: tracker.warnings(),
            errors,
        };
        tracing::info!(
            run_id = %run_id,
            status = %summary.status,
            total_cost_usd = summary.total_cost_usd,
            completed,
            failed,
            skipped,
            "run finished"
        );
        summary
    }
}

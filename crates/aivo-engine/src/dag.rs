//! Per-intent operation dependency graph: validation and execution.
//!
//! Validation runs before anything executes: dangling references, cycles,
//! and out-of-context template placeholders are all configuration errors.
//! Execution walks the graph in topological layers; operations inside a
//! layer run concurrently, a dependent starts only after every dependency
//! succeeded, and a failure skips its transitive dependents while sibling
//! branches continue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use aivo_core::records::{OperationResult, OperationStatus};
use aivo_core::{ConfigError, Intent};
use aivo_extract::AnalysisLlm;
use uuid::Uuid;

use crate::cost::{CostTracker, CostVerdict};
use crate::render::{render_template, validate_template, OpContext};

/// Validates an intent's operation graph and returns its topological
/// layers (indices into `intent.operations`).
///
/// # Errors
///
/// - [`ConfigError::UnknownDependency`] for a `depends_on` id that is not
///   declared in the same intent.
/// - [`ConfigError::DependencyCycle`] when the graph is not acyclic.
/// - [`ConfigError::UnknownPlaceholder`] for a template referencing
///   context it did not declare.
pub fn validate_operations(intent: &Intent) -> Result<Vec<Vec<usize>>, ConfigError> {
    let index_of: HashMap<&str, usize> = intent
        .operations
        .iter()
        .enumerate()
        .map(|(i, op)| (op.id.as_str(), i))
        .collect();

    let mut indegree = vec![0usize; intent.operations.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); intent.operations.len()];

    for (i, op) in intent.operations.iter().enumerate() {
        validate_template(&intent.id, op)?;
        for dep in &op.depends_on {
            let Some(&dep_index) = index_of.get(dep.as_str()) else {
                return Err(ConfigError::UnknownDependency {
                    intent_id: intent.id.clone(),
                    operation_id: op.id.clone(),
                    missing: dep.clone(),
                });
            };
            indegree[i] += 1;
            dependents[dep_index].push(i);
        }
    }

    let mut layers: Vec<Vec<usize>> = Vec::new();
    let mut ready: Vec<usize> = (0..intent.operations.len())
        .filter(|&i| indegree[i] == 0)
        .collect();
    let mut processed = 0usize;

    while !ready.is_empty() {
        ready.sort_unstable();
        processed += ready.len();
        let mut next: Vec<usize> = Vec::new();
        for &i in &ready {
            for &dependent in &dependents[i] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    next.push(dependent);
                }
            }
        }
        layers.push(std::mem::take(&mut ready));
        ready = next;
    }

    if processed < intent.operations.len() {
        let remaining: Vec<String> = intent
            .operations
            .iter()
            .enumerate()
            .filter(|&(i, _)| indegree[i] > 0)
            .map(|(_, op)| op.id.clone())
            .collect();
        return Err(ConfigError::DependencyCycle {
            intent_id: intent.id.clone(),
            remaining,
        });
    }

    Ok(layers)
}

/// Executes a validated operation graph for one intent.
///
/// Every operation is an independent LLM call costed against the owning
/// intent's budget. Skips (failed dependency, exhausted budget, run
/// cancellation) are recorded as explicit results, never silently dropped.
#[allow(clippy::too_many_arguments)]
pub async fn execute_operations(
    run_id: Uuid,
    intent: &Intent,
    layers: &[Vec<usize>],
    answer_text: &str,
    my_rank: Option<u32>,
    competitors: &[String],
    llm: &dyn AnalysisLlm,
    tracker: &CostTracker,
    cancelled: &AtomicBool,
) -> Vec<OperationResult> {
    let mut statuses: HashMap<&str, OperationStatus> = HashMap::new();
    let mut outputs: HashMap<String, String> = HashMap::new();
    let mut results: Vec<OperationResult> = Vec::new();

    for layer in layers {
        let mut running = Vec::new();

        for &index in layer {
            let op = &intent.operations[index];

            if cancelled.load(Ordering::SeqCst) || tracker.intent_exhausted(&intent.id) {
                results.push(skipped(run_id, intent, index, "budget exhausted"));
                statuses.insert(op.id.as_str(), OperationStatus::Skipped);
                continue;
            }

            if let Some(failed_dep) = op
                .depends_on
                .iter()
                .find(|dep| statuses.get(dep.as_str()) != Some(&OperationStatus::Succeeded))
            {
                results.push(skipped(
                    run_id,
                    intent,
                    index,
                    &format!("dependency '{failed_dep}' did not succeed"),
                ));
                statuses.insert(op.id.as_str(), OperationStatus::Skipped);
                continue;
            }

            let context = OpContext {
                intent_prompt: &intent.prompt,
                intent_response: answer_text,
                my_rank,
                competitors,
                dep_outputs: &outputs,
            };
            let prompt = render_template(&op.prompt_template, &context);

            running.push(async move {
                let outcome = llm.complete_text(&prompt, op.model.as_deref()).await;
                (index, outcome)
            });
        }

        for (index, outcome) in futures::future::join_all(running).await {
            let op = &intent.operations[index];
            match outcome {
                Ok(completion) => {
                    if tracker.record(&intent.id, completion.cost_usd) == CostVerdict::RunExceeded {
                        cancelled.store(true, Ordering::SeqCst);
                    }
                    statuses.insert(op.id.as_str(), OperationStatus::Succeeded);
                    outputs.insert(op.id.clone(), completion.text.clone());
                    results.push(OperationResult {
                        run_id,
                        intent_id: intent.id.clone(),
                        operation_id: op.id.clone(),
                        status: OperationStatus::Succeeded,
                        output: Some(completion.text),
                        model: completion.model,
                        cost_usd: completion.cost_usd,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::error!(
                        intent = %intent.id,
                        operation = %op.id,
                        error = %e,
                        "operation failed — dependents will be skipped"
                    );
                    statuses.insert(op.id.as_str(), OperationStatus::Failed);
                    results.push(OperationResult {
                        run_id,
                        intent_id: intent.id.clone(),
                        operation_id: op.id.clone(),
                        status: OperationStatus::Failed,
                        output: None,
                        model: op.model.clone().unwrap_or_default(),
                        cost_usd: 0.0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
    }

    results
}

fn skipped(run_id: Uuid, intent: &Intent, index: usize, reason: &str) -> OperationResult {
    let op = &intent.operations[index];
    OperationResult {
        run_id,
        intent_id: intent.id.clone(),
        operation_id: op.id.clone(),
        status: OperationStatus::Skipped,
        output: None,
        model: op.model.clone().unwrap_or_default(),
        cost_usd: 0.0,
        error: Some(reason.to_owned()),
    }
}

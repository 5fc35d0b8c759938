//! Thin CLI over the AIVO engine: load configuration, execute a run, map
//! the terminal status to a process exit code.

use std::process::ExitCode;
use std::sync::Arc;

use aivo_core::records::RunStatus;
use aivo_core::{
    load_app_config, load_brands, load_intents, load_pricing, load_runners, AppConfig,
    ConfigError, ExtractionMethod, PricingTable,
};
use aivo_engine::{dag, LiveAnalysisLlm, MemorySink, Orchestrator, RunRequest};
use aivo_extract::{AnalysisLlm, ClassificationCache, ExtractionConfig, FileCache, MemoryCache};
use aivo_runners::{RetryPolicy, RunnerContext, RunnerRegistry};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "aivo")]
#[command(about = "AI visibility tracking: query LLM backends, extract brand mentions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Execute a full run against the configured runners
    Run,
    /// Load and validate configuration without executing anything
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match load_app_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return exit_for(RunStatus::ConfigurationError);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run => run(&config).await,
        Commands::Validate => validate(&config),
    }
}

async fn run(config: &AppConfig) -> ExitCode {
    let request = match build_request(config) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            return exit_for(RunStatus::ConfigurationError);
        }
    };

    let pricing = match load_pricing_table(config) {
        Ok(pricing) => Arc::new(pricing),
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            return exit_for(RunStatus::ConfigurationError);
        }
    };

    let cache: Arc<dyn ClassificationCache> = match &config.classification_cache_path {
        Some(path) => match FileCache::open(path) {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                tracing::error!(error = %e, "failed to open classification cache");
                return exit_for(RunStatus::ConfigurationError);
            }
        },
        None => Arc::new(MemoryCache::new()),
    };

    let analysis = match build_analysis(config, &request, Arc::clone(&pricing)) {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            return exit_for(RunStatus::ConfigurationError);
        }
    };

    let sink = Arc::new(MemorySink::new());
    let orchestrator = Orchestrator::new(
        RunnerRegistry::with_builtins(),
        pricing,
        Arc::clone(&sink) as Arc<dyn aivo_engine::RunSink>,
        cache,
        analysis,
    );

    match orchestrator.execute(&request).await {
        Ok(summary) => {
            match serde_json::to_string_pretty(&summary) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => tracing::warn!(error = %e, "failed to render summary"),
            }
            exit_for(summary.status)
        }
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            exit_for(RunStatus::ConfigurationError)
        }
    }
}

fn validate(config: &AppConfig) -> ExitCode {
    match validate_all(config) {
        Ok(()) => {
            println!("configuration OK");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("configuration error: {e}");
            exit_for(RunStatus::ConfigurationError)
        }
    }
}

/// Full validation pass: files parse, graphs are acyclic, runner options
/// satisfy their plugins. Mirrors what `run` would reject, without any
/// network call.
fn validate_all(config: &AppConfig) -> Result<(), ConfigError> {
    let request = build_request(config)?;
    for intent in &request.intents {
        dag::validate_operations(intent)?;
    }
    let pricing = Arc::new(load_pricing_table(config)?);
    let registry = RunnerRegistry::with_builtins();
    let context = RunnerContext {
        pricing,
        request_timeout_secs: config.request_timeout_secs,
    };
    for runner in &request.runners {
        registry.create(runner, &context)?;
    }
    Ok(())
}

fn build_request(config: &AppConfig) -> Result<RunRequest, ConfigError> {
    let intents = load_intents(&config.intents_path)?;
    let brands = load_brands(&config.brands_path)?;
    let runners = load_runners(&config.runners_path)?;
    config.budget.validate()?;

    Ok(RunRequest {
        intents: intents.intents,
        runners: runners.runners,
        brands,
        budget: config.budget,
        max_concurrent_units: config.max_concurrent_units,
        retry: RetryPolicy {
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
        },
        extraction: ExtractionConfig {
            method: config.extraction_method,
            min_confidence: config.min_confidence,
            coverage_floor: config.regex_coverage_floor,
            sentiment_enabled: config.sentiment_enabled,
        },
        classify_enabled: config.classify_enabled,
        request_timeout_secs: config.request_timeout_secs,
    })
}

fn load_pricing_table(config: &AppConfig) -> Result<PricingTable, ConfigError> {
    match &config.pricing_path {
        Some(path) => load_pricing(path),
        None => Ok(PricingTable::builtin()),
    }
}

/// The analysis backend is only constructed when some feature needs it:
/// LLM-assisted extraction, classification, or configured operations.
fn build_analysis(
    config: &AppConfig,
    request: &RunRequest,
    pricing: Arc<PricingTable>,
) -> Result<Option<Arc<dyn AnalysisLlm>>, ConfigError> {
    let needed = config.extraction_method != ExtractionMethod::Regex
        || config.classify_enabled
        || request.intents.iter().any(|i| !i.operations.is_empty());
    if !needed {
        return Ok(None);
    }
    let live = LiveAnalysisLlm::from_app_config(config, pricing)?;
    Ok(Some(Arc::new(live)))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn exit_for(status: RunStatus) -> ExitCode {
    ExitCode::from(status.exit_code() as u8)
}

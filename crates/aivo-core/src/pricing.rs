use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// Per-token pricing for one `(provider, model)` pair, in USD per 1 000 tokens.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ModelPricing {
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
}

impl ModelPricing {
    /// Cost in USD for a call with the given token counts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cost_usd(&self, tokens_in: u64, tokens_out: u64) -> f64 {
        (tokens_in as f64 / 1_000.0) * self.input_cost_per_1k
            + (tokens_out as f64 / 1_000.0) * self.output_cost_per_1k
    }
}

#[derive(Debug, Deserialize)]
struct PricingEntry {
    provider: String,
    model: String,
    input_cost_per_1k: f64,
    output_cost_per_1k: f64,
}

#[derive(Debug, Deserialize)]
struct PricingFile {
    pricing: Vec<PricingEntry>,
}

/// Lookup table of per-token model prices keyed by lowercased
/// `(provider, model)`. A missing entry is not an error: callers treat it
/// as zero cost and record a warning (spend accounting must never crash a
/// run over a pricing gap).
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    entries: HashMap<(String, String), ModelPricing>,
}

impl PricingTable {
    /// Table pre-seeded with prices for the commonly configured models.
    /// A pricing file overrides or extends these.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::default();
        let seed: &[(&str, &str, f64, f64)] = &[
            ("openai", "gpt-4o", 0.0025, 0.01),
            ("openai", "gpt-4o-mini", 0.000_15, 0.0006),
            ("anthropic", "claude-sonnet-4-20250514", 0.003, 0.015),
            ("anthropic", "claude-3-5-haiku-20241022", 0.0008, 0.004),
            ("perplexity", "sonar", 0.001, 0.001),
            ("google", "gemini-2.0-flash", 0.000_1, 0.0004),
        ];
        for &(provider, model, input, output) in seed {
            table.insert(
                provider,
                model,
                ModelPricing {
                    input_cost_per_1k: input,
                    output_cost_per_1k: output,
                },
            );
        }
        table
    }

    pub fn insert(&mut self, provider: &str, model: &str, pricing: ModelPricing) {
        self.entries
            .insert((provider.to_lowercase(), model.to_lowercase()), pricing);
    }

    /// Price for a `(provider, model)` pair, if known.
    #[must_use]
    pub fn lookup(&self, provider: &str, model: &str) -> Option<ModelPricing> {
        self.entries
            .get(&(provider.to_lowercase(), model.to_lowercase()))
            .copied()
    }

    /// Cost of a call, or `None` when the pair is missing from the table.
    #[must_use]
    pub fn cost_usd(
        &self,
        provider: &str,
        model: &str,
        tokens_in: u64,
        tokens_out: u64,
    ) -> Option<f64> {
        self.lookup(provider, model)
            .map(|p| p.cost_usd(tokens_in, tokens_out))
    }
}

/// Load a pricing file and merge it over the builtin table.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_pricing(path: &Path) -> Result<PricingTable, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: PricingFile = serde_yaml::from_str(&content).map_err(|e| ConfigError::FileParse {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut table = PricingTable::builtin();
    for entry in file.pricing {
        table.insert(
            &entry.provider,
            &entry.model,
            ModelPricing {
                input_cost_per_1k: entry.input_cost_per_1k,
                output_cost_per_1k: entry.output_cost_per_1k,
            },
        );
    }
    Ok(table)
}

//! The hybrid extraction pipeline: regex detection, optional LLM
//! function-calling fallback, merge, and rank assignment.

use aivo_core::records::DetectionMethod;
use aivo_core::{BrandsFile, ExtractionMethod};

use crate::detector::BrandDetector;
use crate::error::ExtractError;
use crate::llm::{parse_mention_context, parse_mention_rows, parse_sentiment, AnalysisLlm};
use crate::rank::assign_ranks;
use crate::types::ExtractedMention;

/// Knobs for one engine instance; immutable per run.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionConfig {
    pub method: ExtractionMethod,
    /// LLM-extracted mentions below this confidence are discarded.
    pub min_confidence: f64,
    /// Hybrid mode falls through to the LLM when the fraction of tracked
    /// brands found by regex is below this floor.
    pub coverage_floor: f64,
    pub sentiment_enabled: bool,
}

/// Result of extracting one answer. Never an error: degraded paths fall
/// back to the regex result and are visible via `used_llm`/logs.
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub mentions: Vec<ExtractedMention>,
    /// Cost of the LLM extraction call, zero when none was made.
    pub llm_cost_usd: f64,
    pub used_llm: bool,
}

/// Hybrid regex + LLM mention extractor for one brand configuration.
pub struct ExtractionEngine {
    detector: BrandDetector,
    config: ExtractionConfig,
    brand_names: Vec<String>,
}

impl ExtractionEngine {
    /// Compiles the detector for the configured brands.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Pattern`] if an alias cannot be compiled.
    pub fn new(brands: &BrandsFile, config: ExtractionConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            detector: BrandDetector::new(brands)?,
            config,
            brand_names: brands.brands.iter().map(|b| b.name.clone()).collect(),
        })
    }

    /// Extracts mentions from one answer.
    ///
    /// The LLM is consulted only when the configured method requires it
    /// and `llm` is provided; a failing or malformed LLM call degrades to
    /// the regex result with a warning, never an error.
    pub async fn extract(
        &self,
        answer_text: &str,
        llm: Option<&dyn AnalysisLlm>,
    ) -> ExtractionOutcome {
        let regex_mentions = self.detector.detect(answer_text);

        let mut llm_cost_usd = 0.0;
        let mut used_llm = false;
        let mut merged = regex_mentions;

        if let Some(llm) = llm {
            if self.should_invoke_llm(merged.len()) {
                // The call's cost is recorded even when its output is
                // unusable; the spend happened.
                match self.llm_pass(answer_text, llm).await {
                    (Ok(rows), cost) => {
                        used_llm = true;
                        llm_cost_usd = cost;
                        merge_candidates(&mut merged, rows);
                    }
                    (Err(e), cost) => {
                        llm_cost_usd = cost;
                        tracing::warn!(
                            error = %e,
                            "LLM extraction failed — keeping regex result"
                        );
                    }
                }
            }
        }

        merged.sort_by_key(|m| m.first_offset);
        assign_ranks(answer_text, &mut merged);

        ExtractionOutcome {
            mentions: merged,
            llm_cost_usd,
            used_llm,
        }
    }

    fn should_invoke_llm(&self, regex_hits: usize) -> bool {
        match self.config.method {
            ExtractionMethod::Regex => false,
            ExtractionMethod::FunctionCalling => true,
            ExtractionMethod::Hybrid => {
                if regex_hits == 0 {
                    return true;
                }
                #[allow(clippy::cast_precision_loss)]
                let coverage = regex_hits as f64 / self.brand_names.len().max(1) as f64;
                coverage < self.config.coverage_floor
            }
        }
    }

    async fn llm_pass(
        &self,
        answer_text: &str,
        llm: &dyn AnalysisLlm,
    ) -> (Result<Vec<ExtractedMention>, ExtractError>, f64) {
        let system = extraction_system_prompt(self.config.sentiment_enabled);
        let user = format!(
            "Tracked brands: {}\n\nAnswer text:\n---\n{answer_text}\n---",
            self.brand_names.join(", ")
        );
        let response = match llm.complete_json(&system, &user).await {
            Ok(response) => response,
            Err(e) => return (Err(e), 0.0),
        };
        let rows = match parse_mention_rows(&response.value) {
            Ok(rows) => rows,
            Err(e) => return (Err(e), response.cost_usd),
        };

        let mut candidates = Vec::new();
        for row in rows {
            if row.confidence < self.config.min_confidence {
                tracing::debug!(
                    brand = %row.brand,
                    confidence = row.confidence,
                    "dropping low-confidence LLM mention"
                );
                continue;
            }
            let Some((name, key, is_mine)) = self.detector.resolve(&row.brand) else {
                tracing::warn!(brand = %row.brand, "LLM returned an untracked brand — dropped");
                continue;
            };
            let sentiment = if self.config.sentiment_enabled {
                row.sentiment.as_deref().and_then(parse_sentiment)
            } else {
                None
            };
            let mention_context = if self.config.sentiment_enabled {
                row.mention_context.as_deref().and_then(parse_mention_context)
            } else {
                None
            };
            candidates.push(ExtractedMention {
                brand: name.to_owned(),
                normalized_key: key.to_owned(),
                is_mine,
                rank_position: row.rank_position,
                rank_confidence: if row.rank_position.is_some() {
                    row.confidence
                } else {
                    0.0
                },
                confidence: row.confidence,
                detection_method: DetectionMethod::FunctionCalling,
                sentiment,
                mention_context,
                first_offset: self
                    .detector
                    .first_offset_of(key, answer_text)
                    .unwrap_or(usize::MAX),
            });
        }
        (Ok(candidates), response.cost_usd)
    }
}

/// Merge LLM candidates into the regex set by normalized key, keeping the
/// higher-confidence candidate per key. Exact ties go to the regex side
/// (verbatim-text evidence, and deterministic). A winning regex candidate
/// still absorbs sentiment and context from the losing LLM row, since the
/// detector cannot produce those fields.
fn merge_candidates(merged: &mut Vec<ExtractedMention>, llm_candidates: Vec<ExtractedMention>) {
    for candidate in llm_candidates {
        match merged
            .iter_mut()
            .find(|m| m.normalized_key == candidate.normalized_key)
        {
            None => merged.push(candidate),
            Some(existing) => {
                if candidate.confidence > existing.confidence {
                    *existing = candidate;
                } else {
                    if existing.sentiment.is_none() {
                        existing.sentiment = candidate.sentiment;
                    }
                    if existing.mention_context.is_none() {
                        existing.mention_context = candidate.mention_context;
                    }
                }
            }
        }
    }
}

fn extraction_system_prompt(sentiment_enabled: bool) -> String {
    let mut prompt = String::from(
        "You extract brand mentions from an AI assistant's answer. \
         Respond with JSON only: {\"mentions\": [{\"brand\": string, \
         \"rank_position\": integer or null, \"confidence\": number 0-1, \
         \"context\": string",
    );
    if sentiment_enabled {
        prompt.push_str(
            ", \"sentiment\": \"positive\"|\"neutral\"|\"negative\", \
             \"mention_context\": \"recommendation\"|\"comparison\"|\"example\"|\"warning\"|\"other\"",
        );
    }
    prompt.push_str(
        "}]}. Report every tracked brand the answer mentions, its list \
         position if the answer ranks it, and nothing else.",
    );
    prompt
}

//! Mention extraction and intent classification for AIVO.
//!
//! The extraction engine combines a regex detector (whole-word alias
//! matching, always on) with an optional LLM function-calling extractor
//! (hybrid fallback when regex coverage is weak), merges the two candidate
//! sets by normalized brand key, and assigns rank positions from ordinal
//! markers in the answer text. Extraction never fails a unit: malformed
//! LLM output degrades to the regex result.

pub mod classify;
pub mod detector;
pub mod engine;
pub mod llm;
pub mod normalize;
pub mod rank;

mod error;
mod types;

pub use classify::{classify_intent, query_hash, ClassificationCache, FileCache, MemoryCache};
pub use detector::BrandDetector;
pub use engine::{ExtractionConfig, ExtractionEngine, ExtractionOutcome};
pub use error::ExtractError;
pub use llm::{AnalysisLlm, LlmJson, LlmText};
pub use normalize::canonical_key;
pub use types::ExtractedMention;

//! Shared configuration and record types for AIVO.
//!
//! Everything the orchestration engine consumes — intents, brand lists,
//! runner definitions, budget thresholds, the pricing table, and the
//! write-once record shapes handed to persistence — lives here. Loaders
//! validate eagerly so that a bad configuration fails before any network
//! call is made.

pub mod app_config;
pub mod brands;
pub mod budget;
pub mod config;
pub mod intents;
pub mod pricing;
pub mod records;
pub mod runners;

mod error;

pub use app_config::{AppConfig, Environment, ExtractionMethod};
pub use brands::{load_brands, BrandConfig, BrandsFile, Relationship};
pub use budget::Budget;
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use intents::{load_intents, Intent, IntentsFile, OperationSpec};
pub use pricing::{load_pricing, ModelPricing, PricingTable};
pub use records::{
    IntentClassification, Mention, MentionContext, OperationResult, OperationStatus, RawAnswer,
    RunError, RunStatus, RunSummary, Sentiment,
};
pub use runners::{load_runners, RunnerConfig, RunnersFile};

use aivo_core::ConfigError;
use thiserror::Error;

/// Fatal engine errors.
///
/// Only configuration problems abort a run before it produces a summary;
/// everything else (unit failures, budget exhaustion, extraction
/// degradation) is reflected in the [`aivo_core::RunSummary`] instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

use thiserror::Error;

/// Errors inside the extraction/classification stage.
///
/// These are recovered locally — a malformed LLM payload degrades to the
/// regex result, a cache miss-write failure is logged — and never escalate
/// to a unit or run failure.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A brand alias produced an unusable detection pattern.
    #[error("invalid detection pattern for alias '{alias}': {reason}")]
    Pattern { alias: String, reason: String },

    /// The analysis LLM call itself failed (network, auth, provider error).
    #[error("analysis call failed: {0}")]
    Llm(String),

    /// The analysis LLM returned output that does not match the structured
    /// contract.
    #[error("malformed structured output: {0}")]
    MalformedOutput(String),

    /// The classification cache could not be read or written.
    #[error("classification cache error: {0}")]
    Cache(String),
}

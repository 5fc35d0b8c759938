/// The uniform result every runner returns for one executed intent.
#[derive(Debug, Clone)]
pub struct IntentResult {
    /// Provider the answer came from (`openai`, `anthropic`, `perplexity`).
    pub provider: String,
    /// Model identifier reported by the backend, or the configured one.
    pub model: String,
    pub answer_text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
    /// Browser runners only: path of the captured screenshot.
    pub screenshot_path: Option<String>,
    /// Browser runners only: automation session identifier.
    pub session_id: Option<String>,
}

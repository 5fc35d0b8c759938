use thiserror::Error;

/// Errors surfaced by runner backends.
///
/// The transient/permanent split drives the retry policy: transient
/// errors are retried with back-off, permanent errors are recorded as a
/// unit failure immediately.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The backend rejected the call with HTTP 429.
    #[error("rate limited by {provider}: {message}")]
    RateLimited { provider: String, message: String },

    /// The backend returned a 5xx status.
    #[error("server error from {provider} (status {status})")]
    Server { provider: String, status: u16 },

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the credentials (HTTP 401/403).
    #[error("authentication rejected by {provider}")]
    Auth { provider: String },

    /// The backend rejected the request shape (HTTP 4xx other than
    /// auth/rate-limit).
    #[error("bad request to {provider}: {message}")]
    BadRequest { provider: String, message: String },

    /// The response body did not match the expected shape.
    #[error("invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl RunnerError {
    /// Returns `true` for errors that are worth retrying after a back-off
    /// delay.
    ///
    /// **Retriable:** rate limits, 5xx responses, network-level timeouts
    /// and connection failures.
    ///
    /// **Not retriable:** auth rejections, malformed requests, and
    /// malformed responses — retrying cannot fix those.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            RunnerError::RateLimited { .. } | RunnerError::Server { .. } => true,
            RunnerError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            RunnerError::Auth { .. }
            | RunnerError::BadRequest { .. }
            | RunnerError::InvalidResponse { .. } => false,
        }
    }
}

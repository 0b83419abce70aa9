use thiserror::Error;

/// Errors from LLM provider calls.
///
/// Every variant means the model host could not produce a turn; the
/// orchestrator treats all of them as fatal for the current query.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The request never got a response (DNS, TLS, connection reset...).
    #[error("network: {0}")]
    Network(String),

    /// The provider answered with a non-success status.
    #[error("provider api returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The provider response could not be parsed.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

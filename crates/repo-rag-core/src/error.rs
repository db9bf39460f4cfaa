//! Error taxonomy for the indexing and retrieval pipeline.

use std::fmt;

/// Errors surfaced by core operations.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// Empty or whitespace-only text submitted for embedding or retrieval.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Parameters that would make an operation never terminate.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The embedding provider failed after all attempts were exhausted.
    #[error("embedding unavailable after {attempts} attempt(s): {source}")]
    EmbeddingUnavailable {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// The generation provider failed to produce an answer.
    #[error("synthesis unavailable: {0}")]
    SynthesisUnavailable(#[source] ProviderError),

    /// The vector store rejected an operation.
    #[error("vector store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Failure reported by an external embedding or generation provider.
///
/// `retryable` marks transient failures (timeouts, rate limits, server
/// errors). Non-retryable failures (authentication, malformed requests)
/// are surfaced without further attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderError {}

pub type Result<T, E = RagError> = std::result::Result<T, E>;

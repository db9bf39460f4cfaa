//! Embedding provider trait, the retrying [`Embedder`], and vector utilities.
//!
//! Concrete providers (OpenAI, Ollama, local fastembed) live in the
//! `repo-rag` app crate and implement [`EmbeddingProvider`]. The
//! [`Embedder`] wraps any provider with input validation and bounded
//! exponential backoff.
//!
//! # Retry Strategy
//!
//! - Empty or whitespace-only text → [`RagError::InvalidInput`], provider never called
//! - Retryable provider error → sleep `base_delay × 2^attempt` (attempts zero-indexed) and try again
//! - Non-retryable provider error → fail immediately
//! - After `retries` attempts → [`RagError::EmbeddingUnavailable`]
//!
//! With the defaults (3 attempts, 1s base) a provider that keeps failing
//! blocks the caller for 1s + 2s before the error surfaces.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ProviderError, RagError, Result};

/// Black-box text → vector function.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError>;
}

/// Default number of attempts per text.
pub const DEFAULT_RETRIES: u32 = 3;

/// Validating, retrying front for an [`EmbeddingProvider`].
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    retries: u32,
    base_delay: Duration,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            retries: DEFAULT_RETRIES,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Total attempts per text. Values below 1 are treated as 1.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay slept after the zero-indexed failed `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Embed `text`, retrying transient provider failures.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] for empty or whitespace-only text.
    /// - [`RagError::EmbeddingUnavailable`] once attempts are exhausted
    ///   or the provider reports a non-retryable failure.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "empty or whitespace-only text cannot be embedded".to_string(),
            ));
        }

        let mut attempt = 0u32;
        loop {
            match self.provider.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(err) if err.retryable && attempt + 1 < self.retries => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        model = self.provider.model_name(),
                        attempt = attempt + 1,
                        retries = self.retries,
                        delay_secs = delay.as_secs_f64(),
                        "embedding failed ({}), retrying",
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(RagError::EmbeddingUnavailable {
                        attempts: attempt + 1,
                        source: err,
                    })
                }
            }
        }
    }
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("model", &self.provider.model_name())
            .field("retries", &self.retries)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use repo_rag_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or
/// zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider that replays scripted outcomes, then echoes `[len]`.
    pub(crate) struct ScriptedProvider {
        script: Mutex<VecDeque<std::result::Result<Vec<f32>, ProviderError>>>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedProvider {
        pub(crate) fn new(
            script: Vec<std::result::Result<Vec<f32>, ProviderError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for ScriptedProvider {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop_front() {
                Some(outcome) => outcome,
                None => Ok(vec![text.len() as f32]),
            }
        }
    }

    #[tokio::test]
    async fn test_blank_text_rejected_without_provider_call() {
        let provider = ScriptedProvider::new(vec![]);
        let embedder = Embedder::new(provider.clone());
        for text in ["", "   ", "\n\t "] {
            let err = embedder.embed(text).await.unwrap_err();
            assert!(matches!(err, RagError::InvalidInput(_)));
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success_sleeps_one_plus_two_seconds() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::transient("timeout")),
            Err(ProviderError::transient("rate limited")),
            Ok(vec![0.5, 0.5]),
        ]);
        let embedder = Embedder::new(provider.clone()).with_retries(3);

        let start = tokio::time::Instant::now();
        let vector = embedder.embed("fn main() {}").await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(vector, vec![0.5, 0.5]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert!(elapsed >= Duration::from_secs(3), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(4), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_embedding_unavailable() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::transient("503")),
            Err(ProviderError::transient("503")),
            Err(ProviderError::transient("503")),
        ]);
        let embedder = Embedder::new(provider.clone());

        let err = embedder.embed("query").await.unwrap_err();
        match err {
            RagError::EmbeddingUnavailable { attempts, source } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.message, "503");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_fails_fast() {
        let provider = ScriptedProvider::new(vec![Err(ProviderError::permanent("401"))]);
        let embedder = Embedder::new(provider.clone());

        let start = tokio::time::Instant::now();
        let err = embedder.embed("query").await.unwrap_err();
        assert!(matches!(
            err,
            RagError::EmbeddingUnavailable { attempts: 1, .. }
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[test]
    fn test_backoff_doubles() {
        let embedder = Embedder::new(ScriptedProvider::new(vec![]));
        assert_eq!(embedder.backoff(0), Duration::from_secs(1));
        assert_eq!(embedder.backoff(1), Duration::from_secs(2));
        assert_eq!(embedder.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[test]
    fn test_cosine_identical_and_orthogonal() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}

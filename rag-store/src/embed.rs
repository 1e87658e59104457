//! Embedding orchestration: provider contract, rate limiting, and
//! batch embedding with per-item failure isolation.
//!
//! One text in, one vector out. Batches are strictly sequential; the only
//! temporal coordination is the client's own [`RateLimiter`], which blocks
//! until the minimum inter-request interval has elapsed. A failed item
//! never aborts the batch: its position carries `None` and the failure is
//! surfaced through the [`Reporter`].

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use ai_llm_service::LlmServiceProfiles;

use crate::config::RagConfig;
use crate::errors::RagError;
use crate::reporter::Reporter;

/// Provider interface for embedding generation.
///
/// Implement this to plug in an embedding backend (Ollama, OpenAI-style
/// APIs, local models). Transport-level retries belong inside the
/// implementation; the client above only isolates per-item failures.
pub trait EmbeddingsProvider: Send + Sync {
    /// Async embedding of a single text.
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;
}

/// [`EmbeddingsProvider`] backed by the shared LLM service profiles.
pub struct ProfileEmbedder {
    svc: Arc<LlmServiceProfiles>,
}

impl ProfileEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl EmbeddingsProvider for ProfileEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(async move {
            self.svc
                .embed(text)
                .await
                .map_err(|source| RagError::Llm {
                    op: "embed",
                    source,
                })
        })
    }
}

/// Minimum-interval rate limiter (a leaky bucket of one).
///
/// Tracks the instant of the last request and sleeps out the remainder of
/// the interval before the next one. Sufficient because calls are
/// sequential, never concurrent; state is owned by the client instance, so
/// independent clients (and tests) do not interfere.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Limiter allowing at most `max_rps` requests per second.
    pub fn new(max_rps: f64) -> Self {
        let max_rps = max_rps.max(f64::EPSILON);
        Self {
            min_interval: Duration::from_secs_f64(1.0 / max_rps),
            last_request: None,
        }
    }

    /// Blocks until the minimum interval since the previous request has
    /// elapsed, then marks the new request.
    pub async fn wait_if_needed(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// Embedding client: throttling, dimension enforcement, optional
/// unit-length normalization, and batch orchestration.
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingsProvider>,
    limiter: Mutex<RateLimiter>,
    dimension: usize,
    normalize: bool,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingsProvider>, cfg: &RagConfig) -> Self {
        Self {
            provider,
            limiter: Mutex::new(RateLimiter::new(cfg.embed_max_rps)),
            dimension: cfg.embedding_dim,
            normalize: cfg.normalize_embeddings,
        }
    }

    /// Embeds a single text.
    ///
    /// # Errors
    /// Propagates provider failures; returns
    /// [`RagError::VectorSizeMismatch`] when the backend answers with the
    /// wrong dimensionality.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.limiter.lock().await.wait_if_needed().await;

        let mut vector = self.provider.embed(text).await?;
        if vector.len() != self.dimension {
            return Err(RagError::VectorSizeMismatch {
                got: vector.len(),
                want: self.dimension,
            });
        }
        if self.normalize {
            normalize_unit(&mut vector);
        }
        Ok(vector)
    }

    /// Embeds a batch of texts, strictly in order.
    ///
    /// The output has exactly the input's length: index `i` always holds
    /// the result for `texts[i]`, with `None` marking a failed item. Other
    /// positions are unaffected by a failure; nonzero failure totals are
    /// reported once the batch completes.
    pub async fn embed_batch(
        &self,
        texts: &[String],
        reporter: &dyn Reporter,
    ) -> Vec<Option<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        let mut failed = 0usize;

        for (i, text) in texts.iter().enumerate() {
            match self.embed_one(text).await {
                Ok(v) => results.push(Some(v)),
                Err(e) => {
                    failed += 1;
                    reporter.warn(&format!(
                        "embedding failed for item {i} (text length {}): {}",
                        text.chars().count(),
                        truncate_error(&e)
                    ));
                    results.push(None);
                }
            }
        }

        debug!(total = texts.len(), failed, "embed_batch finished");
        if failed > 0 {
            reporter.warn(&format!(
                "{failed} of {} embeddings failed and will be skipped",
                texts.len()
            ));
        }

        results
    }
}

/// Scales a vector to unit L2 length; zero vectors stay untouched.
fn normalize_unit(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn truncate_error(e: &RagError) -> String {
    let s = e.to_string();
    if s.chars().count() > 160 {
        let mut t: String = s.chars().take(160).collect();
        t.push('…');
        t
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cfg(dim: usize, normalize: bool, rps: f64) -> RagConfig {
        RagConfig {
            qdrant_url: "http://localhost:6334".into(),
            qdrant_api_key: None,
            collection: "test".into(),
            distance: crate::config::DistanceKind::Cosine,
            chunk_size: 500,
            chunk_overlap: 50,
            similarity_threshold: 0.7,
            top_k: 3,
            embedding_dim: dim,
            normalize_embeddings: normalize,
            embed_max_rps: rps,
            upsert_batch: 500,
        }
    }

    /// Provider that fails on one configured call index.
    struct FailAt {
        fail_index: usize,
        calls: AtomicUsize,
        dim: usize,
    }

    impl EmbeddingsProvider for FailAt {
        fn embed<'a>(
            &'a self,
            _text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if n == self.fail_index {
                    Err(RagError::Validation("backend exploded".into()))
                } else {
                    Ok(vec![n as f32; self.dim])
                }
            })
        }
    }

    #[derive(Default)]
    struct CountingReporter {
        warns: AtomicUsize,
    }

    impl Reporter for CountingReporter {
        fn info(&self, _message: &str) {}
        fn warn(&self, _message: &str) {
            self.warns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn batch_preserves_length_and_positions_under_failure() {
        let provider = Arc::new(FailAt {
            fail_index: 3,
            calls: AtomicUsize::new(0),
            dim: 4,
        });
        let client = EmbeddingClient::new(provider, &cfg(4, false, 1000.0));
        let reporter = CountingReporter::default();

        let texts: Vec<String> = (0..5).map(|i| format!("text {i}")).collect();
        let out = client.embed_batch(&texts, &reporter).await;

        assert_eq!(out.len(), 5);
        assert!(out[3].is_none());
        for i in [0usize, 1, 2, 4] {
            assert!(out[i].is_some(), "position {i} should hold a vector");
        }
        // One per-item warning plus one aggregate.
        assert_eq!(reporter.warns.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_dimension_is_a_failure_marker_in_batches() {
        let provider = Arc::new(FailAt {
            fail_index: usize::MAX,
            calls: AtomicUsize::new(0),
            dim: 8,
        });
        let client = EmbeddingClient::new(provider, &cfg(4, false, 1000.0));
        let reporter = CountingReporter::default();

        let out = client.embed_batch(&["x".to_string()], &reporter).await;
        assert_eq!(out, vec![None]);
    }

    #[tokio::test(start_paused = true)]
    async fn normalization_yields_unit_vectors() {
        struct Fixed;
        impl EmbeddingsProvider for Fixed {
            fn embed<'a>(
                &'a self,
                _text: &'a str,
            ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>
            {
                Box::pin(async { Ok(vec![3.0, 4.0]) })
            }
        }

        let client = EmbeddingClient::new(Arc::new(Fixed), &cfg(2, true, 1000.0));
        let v = client.embed_one("x").await.unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limiter_enforces_minimum_interval() {
        let mut limiter = RateLimiter::new(10.0); // 100 ms between requests

        let start = Instant::now();
        limiter.wait_if_needed().await;
        limiter.wait_if_needed().await;
        limiter.wait_if_needed().await;

        // Two full intervals must have passed for three requests.
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limiter_first_request_is_immediate() {
        let mut limiter = RateLimiter::new(0.001); // huge interval
        let start = Instant::now();
        limiter.wait_if_needed().await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }
}

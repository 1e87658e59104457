//! Bounded retry with exponential backoff and jitter for transient failures.
//!
//! Provider clients wrap their HTTP calls in [`RetryPolicy::run`]. Only
//! errors classified as transient by [`AiLlmError::is_transient`] are
//! retried (throttling, timeouts, 5xx); permanent errors surface
//! immediately. When attempts are exhausted the last transient error is
//! escalated as [`AiLlmError::RetriesExhausted`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error_handler::AiLlmError;

/// Retry policy for transient transport failures.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (must be >= 1).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), without jitter.
    ///
    /// Doubles per attempt starting from `base_delay`, capped at
    /// `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exp);
        delay.min(self.max_delay)
    }

    /// Backoff with "equal jitter": half fixed, half uniformly random.
    /// Keeps retries spread out without collapsing the lower bound to zero.
    fn backoff_jittered(&self, attempt: u32) -> Duration {
        let half_ms = (self.backoff(attempt).as_millis() / 2) as u64;
        let jitter_ms = rand::thread_rng().gen_range(0..=half_ms);
        Duration::from_millis(half_ms + jitter_ms)
    }

    /// Runs `op`, retrying transient failures up to `max_attempts` times.
    ///
    /// `op_name` is used for logging and for the final
    /// [`AiLlmError::RetriesExhausted`] message.
    ///
    /// # Errors
    /// Returns the first permanent error unchanged, or
    /// [`AiLlmError::RetriesExhausted`] once transient retries run out.
    pub async fn run<T, F, Fut>(&self, op_name: &'static str, mut op: F) -> Result<T, AiLlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AiLlmError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.backoff_jittered(attempt);
                    warn!(
                        op = op_name,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, backing off before retry"
                    );
                    last_error = e.to_string();
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    return Err(AiLlmError::RetriesExhausted {
                        op: op_name,
                        attempts,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // Only reachable with max_attempts == 0, which we clamp to 1 above.
        Err(AiLlmError::RetriesExhausted {
            op: op_name,
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::ConfigError;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn throttled() -> AiLlmError {
        AiLlmError::HttpStatus {
            status: StatusCode::TOO_MANY_REQUESTS,
            url: "http://localhost".into(),
            snippet: String::new(),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(policy.backoff(10), Duration::from_secs(8));
        assert_eq!(policy.backoff(32), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_is_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = policy
            .run("generate", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AiLlmError::from(ConfigError::EmptyModel)) }
            })
            .await;
        assert!(matches!(res, Err(AiLlmError::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_retry_until_exhausted() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
        };
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = policy
            .run("embeddings", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(throttled()) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match res {
            Err(AiLlmError::RetriesExhausted { op, attempts, .. }) => {
                assert_eq!(op, "embeddings");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
        };
        let calls = AtomicU32::new(0);
        let res = policy
            .run("embeddings", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 { Err(throttled()) } else { Ok(42u32) }
                }
            })
            .await;
        assert_eq!(res.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

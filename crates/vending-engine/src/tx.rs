//! # Timeouts and Transaction Retry
//!
//! Every store and session call is bounded; every read-modify-write runs
//! through [`run_tx`], which retries the whole transaction when it loses an
//! optimistic concurrency race.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  attempt 1 ── begin → read → plan → save (CAS) → commit                 │
//! │       │                                                                 │
//! │       ├── Ok ───────────────────────────────────────────► done          │
//! │       ├── Conflict ── sleep next_backoff() ──► attempt 2 ...            │
//! │       ├── elapsed > store_timeout ──► Timeout (tx dropped = rollback)   │
//! │       └── other error ─────────────────────────────────► returned as is │
//! │                                                                         │
//! │  attempt N still Conflict ──► RetriesExhausted                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Backoff Strategy
//! Exponential with jitter, starting at 10ms and capped at 200ms per wait.
//! `max_attempts` bounds the loop, not elapsed time.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};

/// Bounds applied to store work.
#[derive(Debug, Clone, Copy)]
pub struct TxPolicy {
    /// Upper bound for one attempt.
    pub timeout: Duration,

    /// Attempts before giving up on conflicts.
    pub max_attempts: u32,

    /// First wait after a conflict. Default: 10ms
    pub initial_backoff: Duration,

    /// Longest single wait. Default: 200ms
    pub max_backoff: Duration,
}

impl TxPolicy {
    pub fn new(timeout: Duration, max_attempts: u32) -> Self {
        TxPolicy {
            timeout,
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(200),
        }
    }

    pub fn backoff_between(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            current_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Awaits `fut`, failing with `Timeout` after `limit`.
///
/// A future that times out is dropped, which releases anything it held.
pub async fn bounded<T, E, F>(limit: Duration, operation: &'static str, fut: F) -> EngineResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<EngineError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            tracing::error!(operation, timeout_ms = limit.as_millis() as u64, "Operation timed out");
            Err(EngineError::Timeout { operation })
        }
    }
}

/// Runs `attempt` until it succeeds, fails with a non-conflict error, or
/// uses up `policy.max_attempts`.
pub async fn run_tx<T, F, Fut>(policy: TxPolicy, operation: &'static str, mut attempt: F) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let mut backoff = policy.create_backoff();

    for n in 1..=policy.max_attempts {
        match bounded(policy.timeout, operation, attempt()).await {
            Err(err) if err.is_retryable() => {
                if n == policy.max_attempts {
                    break;
                }
                let wait = backoff.next_backoff().unwrap_or(policy.max_backoff);
                tracing::debug!(operation, attempt = n, ?wait, "Transaction conflict, retrying");
                tokio::time::sleep(wait).await;
            }
            other => return other,
        }
    }

    tracing::error!(
        operation,
        attempts = policy.max_attempts,
        "Transaction kept conflicting"
    );
    Err(EngineError::RetriesExhausted {
        operation,
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(max_attempts: u32) -> TxPolicy {
        TxPolicy::new(Duration::from_millis(500), max_attempts)
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = run_tx(policy(5), "test", || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(EngineError::Conflict)
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: EngineResult<()> = run_tx(policy(3), "test", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::Conflict)
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(EngineError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: EngineResult<()> = run_tx(policy(5), "test", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::InvalidInput("nope".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_future_times_out() {
        let result: EngineResult<()> = bounded(Duration::from_secs(1), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), EngineError>(())
        })
        .await;

        assert!(matches!(
            result,
            Err(EngineError::Timeout { operation: "slow" })
        ));
    }

    #[test]
    fn test_policy_has_at_least_one_attempt() {
        assert_eq!(TxPolicy::new(Duration::from_secs(1), 0).max_attempts, 1);
    }

    #[test]
    fn test_backoff_grows_and_stays_capped() {
        let policy = TxPolicy::new(Duration::from_secs(1), 10)
            .backoff_between(Duration::from_millis(10), Duration::from_millis(80));
        let mut backoff = policy.create_backoff();

        let waits: Vec<Duration> = (0..8).filter_map(|_| backoff.next_backoff()).collect();

        assert_eq!(waits.len(), 8);
        // Jitter is +/- 50% around the current interval
        assert!(waits[0] >= Duration::from_millis(5) && waits[0] <= Duration::from_millis(16));
        assert!(waits.iter().all(|w| *w <= Duration::from_millis(121)));
    }
}

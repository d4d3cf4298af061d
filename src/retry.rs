// Bounded retry with exponential backoff for source fetches and bulk inserts.
// Every attempt and every backoff sleep is bounded by the caller's deadline.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }

    /// Sleep after the failed attempt number `attempt` (1-based): initial * 2^(attempt-1), capped.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Longest a retried operation can take when every attempt runs for `per_attempt` and fails.
    pub fn worst_case(&self, per_attempt: Duration) -> Duration {
        let sleeps: Duration = (1..self.max_attempts).map(|a| self.backoff_after(a)).sum();
        per_attempt.saturating_mul(self.max_attempts) + sleeps
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error("deadline exceeded after {attempts} attempts")]
    DeadlineExceeded { attempts: u32 },
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. }
            | RetryError::DeadlineExceeded { attempts }
            | RetryError::Cancelled { attempts } => *attempts,
        }
    }
}

/// Runs `op(attempt)` until it succeeds, `policy.max_attempts` is reached, `deadline` passes,
/// or `cancel` fires. Cancellation drops the in-flight attempt.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    deadline: Instant,
    cancel: Option<&CancellationToken>,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let cancelled = move || async move {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = cancelled() => return Err(RetryError::Cancelled { attempts: attempt - 1 }),
            r = tokio::time::timeout_at(deadline, op(attempt)) => r,
        };
        let err = match result {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => return Err(RetryError::DeadlineExceeded { attempts: attempt }),
        };
        if attempt >= policy.max_attempts {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: err,
            });
        }

        let backoff = policy.backoff_after(attempt);
        tracing::debug!(
            attempt,
            backoff_ms = backoff.as_millis() as u64,
            error = %err,
            "attempt failed, backing off"
        );
        let wake = (Instant::now() + backoff).min(deadline);
        tokio::select! {
            biased;
            _ = cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
            _ = tokio::time::sleep_until(wake) => {}
        }
    }
}

//! Bounded retry state machine for translation calls.
//!
//! Every failure is retried up to `max_attempts` total attempts, sleeping
//! `backoff(attempt)` between them. The run ends in exactly one of
//! [`RetryOutcome::Success`], [`RetryOutcome::RateLimitExhausted`] or
//! [`RetryOutcome::ServiceErrorExhausted`].
//!
//! | Attempt failed | Sleep before next attempt (base = 2 s) |
//! |----------------|----------------------------------------|
//! | 1              | 2 s                                    |
//! | 2              | 4 s                                    |
//! | 3 (= max)      | stop                                   |

use std::future::Future;
use std::time::Duration;

use crate::error::TranslateError;

/// Longest sleep a server `Retry-After` hint can impose between attempts.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &mavs_core::TranslationSettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_millis(settings.backoff_base_ms),
        )
    }

    /// Delay after the `attempt`-th failure (1-based): `base × attempt`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Sleep before the next attempt after `err` ended attempt `attempt`.
    ///
    /// A `Retry-After` hint may lengthen the backoff, but never past
    /// [`MAX_RETRY_AFTER`] unless the backoff itself is already longer.
    #[must_use]
    pub fn delay_after(&self, attempt: u32, err: &TranslateError) -> Duration {
        let backoff = self.backoff(attempt);
        match err {
            TranslateError::RateLimited {
                retry_after_secs: Some(secs),
            } => backoff.max(Duration::from_secs(*secs).min(MAX_RETRY_AFTER)),
            _ => backoff,
        }
    }
}

#[derive(Debug)]
pub enum RetryOutcome<T> {
    Success(T),
    RateLimitExhausted { attempts: u32 },
    ServiceErrorExhausted { attempts: u32, last_error: TranslateError },
}

impl<T> RetryOutcome<T> {
    /// # Errors
    ///
    /// Maps the exhausted variants to [`TranslateError::RateLimitExhausted`]
    /// and [`TranslateError::ServiceErrorExhausted`].
    pub fn into_result(self) -> Result<T, TranslateError> {
        match self {
            RetryOutcome::Success(value) => Ok(value),
            RetryOutcome::RateLimitExhausted { attempts } => {
                Err(TranslateError::RateLimitExhausted { attempts })
            }
            RetryOutcome::ServiceErrorExhausted {
                attempts,
                last_error,
            } => Err(TranslateError::ServiceErrorExhausted {
                attempts,
                last_error: last_error.to_string(),
            }),
        }
    }
}

/// Runs `operation` under `policy`.
///
/// A `Retry-After` hint on a 429 raises the sleep to at least that many
/// seconds, capped at [`MAX_RETRY_AFTER`].
pub async fn run_with_retry<T, F, Fut>(policy: RetryPolicy, mut operation: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TranslateError>>,
{
    let mut attempt = 1u32;

    loop {
        let err = match operation(attempt).await {
            Ok(value) => return RetryOutcome::Success(value),
            Err(err) => err,
        };

        if attempt >= policy.max_attempts {
            return match err {
                TranslateError::RateLimited { .. } => {
                    tracing::warn!(attempts = attempt, "translation rate limit exhausted");
                    RetryOutcome::RateLimitExhausted { attempts: attempt }
                }
                other => {
                    tracing::warn!(attempts = attempt, error = %other, "translation service errors exhausted");
                    RetryOutcome::ServiceErrorExhausted {
                        attempts: attempt,
                        last_error: other,
                    }
                }
            };
        }

        let delay = policy.delay_after(attempt, &err);
        tracing::warn!(
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "translation attempt failed; retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

//! Bounded retries for idempotent reads.
//!
//! Writes never go through here: a write that timed out may still have been
//! applied, so retrying it could surface a spurious `AlreadyExists`.

use std::{future::Future, time::Duration};

use crate::error::{IndexError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first.
  pub max_attempts:  u32,
  pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
  fn default() -> Self { Self { max_attempts: 3, base_delay_ms: 50 } }
}

impl RetryPolicy {
  /// No retries at all.
  pub fn none() -> Self { Self { max_attempts: 1, base_delay_ms: 0 } }

  /// Delay before attempt `attempt + 1`: `base * 2^(attempt - 1)`.
  pub fn delay_after(&self, attempt: u32) -> Duration {
    if attempt == 0 {
      return Duration::ZERO;
    }
    Duration::from_millis(self.base_delay_ms.saturating_mul(1 << (attempt - 1).min(10)))
  }
}

/// Outcome of a read that may have been retried.
#[derive(Debug)]
pub(crate) enum ReadError {
  /// Still failing transiently after the last attempt.
  Exhausted(IndexError),
  Failed(IndexError),
}

/// Run `op`, retrying transient failures per `policy`.
pub(crate) async fn retry_read<T, F, Fut>(
  policy: RetryPolicy,
  what: &str,
  mut op: F,
) -> Result<T, ReadError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let mut attempt = 1;
  loop {
    match op().await {
      Ok(v) => return Ok(v),
      Err(e) if e.is_transient() && attempt < policy.max_attempts => {
        let delay = policy.delay_after(attempt);
        tracing::warn!(attempt, ?delay, error = %e, "retrying {what}");
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      Err(e) if e.is_transient() => return Err(ReadError::Exhausted(e)),
      Err(e) => return Err(ReadError::Failed(e)),
    }
  }
}

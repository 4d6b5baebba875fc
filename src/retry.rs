//! Retry policies for remote calls.
//!
//! Read-path queries retry transient failures with exponential backoff;
//! mutation-path requests retry at most once. Non-retryable failures (4xx,
//! decode errors, cancellation) always propagate immediately.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::api::ApiError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  max_retries: u32,
  base_delay: Duration,
  max_delay: Duration,
  exponential: bool,
}

impl RetryPolicy {
  /// Queries: up to 3 retries at 1s, 2s, 4s, capped at 30s.
  pub fn read_path() -> Self {
    Self {
      max_retries: 3,
      base_delay: Duration::from_secs(1),
      max_delay: Duration::from_secs(30),
      exponential: true,
    }
  }

  /// Mutations: a single retry after 1s.
  pub fn mutation_path() -> Self {
    Self {
      max_retries: 1,
      base_delay: Duration::from_secs(1),
      max_delay: Duration::from_secs(1),
      exponential: false,
    }
  }

  fn delay(&self, attempt: u32) -> Duration {
    if !self.exponential {
      return self.base_delay;
    }
    let factor = 2u32.saturating_pow(attempt);
    self.base_delay.saturating_mul(factor).min(self.max_delay)
  }
}

/// Run `op`, retrying retryable failures per `policy`.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, ApiError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, ApiError>>,
{
  let mut attempt = 0;
  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(err) if err.is_retryable() && attempt < policy.max_retries => {
        let delay = policy.delay(attempt);
        debug!(attempt, ?delay, %err, "retrying after transient failure");
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      Err(err) => return Err(err),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  fn server_error() -> ApiError {
    ApiError::Server {
      status: 500,
      message: "boom".to_string(),
    }
  }

  fn validation_error() -> ApiError {
    ApiError::Validation {
      status: 400,
      detail: "bad".to_string(),
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_transient_failures_are_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let result = with_retry(RetryPolicy::read_path(), move || {
      let counter = Arc::clone(&counter);
      async move {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
          Err(server_error())
        } else {
          Ok(42)
        }
      }
    })
    .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_client_errors_are_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let result: Result<u32, _> = with_retry(RetryPolicy::read_path(), move || {
      let counter = Arc::clone(&counter);
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(validation_error())
      }
    })
    .await;

    assert!(matches!(result, Err(ApiError::Validation { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_mutation_path_retries_exactly_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let result: Result<u32, _> = with_retry(RetryPolicy::mutation_path(), move || {
      let counter = Arc::clone(&counter);
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(server_error())
      }
    })
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn test_backoff_schedule() {
    let policy = RetryPolicy::read_path();
    assert_eq!(policy.delay(0), Duration::from_secs(1));
    assert_eq!(policy.delay(1), Duration::from_secs(2));
    assert_eq!(policy.delay(2), Duration::from_secs(4));
    assert_eq!(policy.delay(10), Duration::from_secs(30));
  }
}

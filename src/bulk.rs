//! Bulk user operations.
//!
//! One user intent ("deactivate these 12 accounts") fans out into independent
//! per-id remote calls (the backend has no batch endpoint for these), which
//! are launched concurrently and settled collectively. Every id gets its own
//! outcome; the batch reports succeeded/failed counts instead of collapsing
//! the first rejection into a single opaque failure. Per batch there is
//! exactly one invalidation of the collection key family and exactly one
//! notification.

use futures::future;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::ApiError;
use crate::cache::{CacheStore, InvalidationScheduler};
use crate::cancel::CancelToken;
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperationKind {
  Activate,
  Deactivate,
  Delete,
}

impl BulkOperationKind {
  fn past_tense(self) -> &'static str {
    match self {
      BulkOperationKind::Activate => "activated",
      BulkOperationKind::Deactivate => "deactivated",
      BulkOperationKind::Delete => "deleted",
    }
  }
}

impl fmt::Display for BulkOperationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      BulkOperationKind::Activate => "activate",
      BulkOperationKind::Deactivate => "deactivate",
      BulkOperationKind::Delete => "delete",
    };
    f.write_str(name)
  }
}

/// Terminal state of one id within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Succeeded,
  Failed(String),
}

/// Aggregate result of a settled batch.
#[derive(Debug, Clone)]
pub struct BulkReport {
  pub kind: BulkOperationKind,
  /// Per-id outcomes, in the order the ids were submitted.
  pub outcomes: Vec<(String, Outcome)>,
}

impl BulkReport {
  pub fn succeeded(&self) -> usize {
    self
      .outcomes
      .iter()
      .filter(|(_, o)| *o == Outcome::Succeeded)
      .count()
  }

  pub fn failed(&self) -> usize {
    self.outcomes.len() - self.succeeded()
  }

  pub fn all_succeeded(&self) -> bool {
    self.failed() == 0
  }

  /// The ids that failed, with their reasons.
  pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
    self.outcomes.iter().filter_map(|(id, o)| match o {
      Outcome::Failed(reason) => Some((id.as_str(), reason.as_str())),
      Outcome::Succeeded => None,
    })
  }
}

/// Fans one intent out over N ids and drives the aggregate outcome.
#[derive(Clone)]
pub struct BulkRunner {
  invalidator: InvalidationScheduler,
  notifier: Notifier,
}

impl BulkRunner {
  pub fn new(store: Arc<CacheStore>, notifier: Notifier) -> Self {
    Self {
      invalidator: InvalidationScheduler::new(store),
      notifier,
    }
  }

  /// Run `op` for every id concurrently and settle them all.
  ///
  /// `family` is the cache key family holding the collection queries to
  /// invalidate once the batch settles (one invalidation per batch, not per
  /// id). A token that has already fired aborts before anything is
  /// dispatched; firing mid-flight abandons the batch, which still
  /// invalidates the family since some calls may have landed server-side.
  pub async fn run<F, Fut>(
    &self,
    kind: BulkOperationKind,
    ids: Vec<String>,
    cancel: &CancelToken,
    family: &str,
    op: F,
  ) -> Result<BulkReport, ApiError>
  where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<(), ApiError>>,
  {
    if cancel.is_cancelled() {
      return Err(ApiError::Cancelled);
    }

    info!(%kind, count = ids.len(), "starting bulk operation");

    let jobs = ids.into_iter().map(|id| {
      let call = op(id.clone());
      async move { (id, call.await) }
    });

    let results = tokio::select! {
      biased;
      _ = cancel.clone().cancelled() => {
        warn!(%kind, "bulk operation cancelled mid-flight");
        self.invalidator.invalidate_family(family);
        return Err(ApiError::Cancelled);
      }
      results = future::join_all(jobs) => results,
    };

    let outcomes = results
      .into_iter()
      .map(|(id, result)| {
        let outcome = match result {
          Ok(()) => Outcome::Succeeded,
          Err(err) => {
            warn!(%kind, id, %err, "bulk operation failed for id");
            Outcome::Failed(err.user_message())
          }
        };
        (id, outcome)
      })
      .collect();

    let report = BulkReport { kind, outcomes };

    self.invalidator.invalidate_family(family);
    self.notify(&report);

    Ok(report)
  }

  fn notify(&self, report: &BulkReport) {
    let verb = report.kind.past_tense();
    if report.all_succeeded() {
      self.notifier.success(
        format!("Users {verb}"),
        format!("{} users {verb} successfully", report.succeeded()),
      );
    } else {
      self.notifier.error(
        "Bulk action failed",
        format!(
          "{} users {verb}, {} failed",
          report.succeeded(),
          report.failed()
        ),
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  use crate::cancel::CancelSource;
  use crate::notify::{Notifier, Severity};

  fn runner() -> (
    BulkRunner,
    Arc<CacheStore>,
    tokio::sync::mpsc::UnboundedReceiver<crate::notify::Notification>,
  ) {
    let store = Arc::new(CacheStore::new());
    let (notifier, rx) = Notifier::channel();
    (BulkRunner::new(Arc::clone(&store), notifier), store, rx)
  }

  fn ids(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("u{i}")).collect()
  }

  #[tokio::test]
  async fn test_all_succeed() {
    let (runner, store, mut rx) = runner();
    store.put("users:list:abc", json!([]));

    let report = runner
      .run(
        BulkOperationKind::Deactivate,
        ids(5),
        &CancelToken::never(),
        "users",
        |_| async { Ok(()) },
      )
      .await
      .unwrap();

    assert_eq!(report.succeeded(), 5);
    assert_eq!(report.failed(), 0);
    assert!(report.all_succeeded());

    // Collection invalidated once, one success notification with the count.
    assert!(store.read("users:list:abc").unwrap().is_stale);
    let notification = rx.try_recv().unwrap();
    assert_eq!(notification.severity, Severity::Success);
    assert_eq!(
      notification.detail.as_deref(),
      Some("5 users deactivated successfully")
    );
    assert!(rx.try_recv().is_err(), "exactly one notification per batch");
  }

  #[tokio::test]
  async fn test_one_failure_keeps_per_id_outcomes() {
    let (runner, store, mut rx) = runner();
    store.put("users:list:abc", json!([]));

    let report = runner
      .run(
        BulkOperationKind::Delete,
        ids(5),
        &CancelToken::never(),
        "users",
        |id| async move {
          if id == "u3" {
            Err(ApiError::Validation {
              status: 409,
              detail: "User has borrowed specimens".to_string(),
            })
          } else {
            Ok(())
          }
        },
      )
      .await
      .unwrap();

    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.failed(), 1);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures, vec![("u3", "User has borrowed specimens")]);

    assert!(store.read("users:list:abc").unwrap().is_stale);
    let notification = rx.try_recv().unwrap();
    assert_eq!(notification.severity, Severity::Error);
    assert_eq!(notification.detail.as_deref(), Some("4 users deleted, 1 failed"));
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_outcomes_keep_submission_order() {
    let (runner, _store, _rx) = runner();

    let report = runner
      .run(
        BulkOperationKind::Activate,
        ids(3),
        &CancelToken::never(),
        "users",
        |_| async { Ok(()) },
      )
      .await
      .unwrap();

    let order: Vec<_> = report.outcomes.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(order, vec!["u1", "u2", "u3"]);
  }

  #[tokio::test]
  async fn test_fired_token_aborts_before_dispatch() {
    let (runner, _store, mut rx) = runner();
    let source = CancelSource::new();
    source.cancel();
    let token = source.token();

    let dispatched = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&dispatched);

    let result = runner
      .run(BulkOperationKind::Delete, ids(5), &token, "users", move |_| {
        let counter = Arc::clone(&counter);
        async move {
          counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
          Ok(())
        }
      })
      .await;

    assert!(matches!(result, Err(ApiError::Cancelled)));
    assert_eq!(dispatched.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(rx.try_recv().is_err(), "no notification for a cancelled batch");
  }
}

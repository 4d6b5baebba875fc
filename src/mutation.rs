//! Optimistic mutation coordination.
//!
//! A mutation snapshots the current cache state, publishes the predicted
//! result immediately so the UI reflects the intended end state, then issues
//! the remote write. The server's response becomes ground truth on success;
//! on failure the snapshot is restored verbatim. Either way the key is
//! invalidated exactly once at settle time, so even a committed optimistic
//! guess is reconciled against the server on the next read.
//!
//! Concurrent mutations on the same key are not serialized. Each optimistic
//! write records the entry version it produced and may only commit or roll
//! back while that version is still current; a mutation that settles after
//! the key has advanced leaves the newer state alone and relies on the
//! invalidation to reconcile.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::api::ApiError;
use crate::cache::{CacheStore, InvalidationScheduler};
use crate::cancel::CancelToken;

/// State captured when a mutation begins, consumed when it settles.
struct MutationIntent {
  snapshot: Option<Value>,
  base_version: Option<u64>,
  wrote_optimistic: bool,
}

/// Drives single-entity optimistic mutations against the shared cache.
#[derive(Clone)]
pub struct MutationCoordinator {
  store: Arc<CacheStore>,
  invalidator: InvalidationScheduler,
}

impl MutationCoordinator {
  pub fn new(store: Arc<CacheStore>) -> Self {
    let invalidator = InvalidationScheduler::new(Arc::clone(&store));
    Self { store, invalidator }
  }

  /// Run one optimistic mutation against `key`.
  ///
  /// `patch` predicts the post-mutation value from the currently-visible one
  /// (which may itself be an uncommitted optimistic guess); returning `None`
  /// skips the optimistic write, e.g. when there is nothing cached to patch
  /// or the result cannot be predicted locally. `write` is the remote call,
  /// with any retry already composed in by the caller.
  ///
  /// If `cancel` fires while the write is in flight, the result is
  /// discarded: no commit, no rollback, and [`ApiError::Cancelled`] is
  /// returned. The key is still invalidated, since the optimistic value
  /// already published must not outlive its mutation unchecked.
  pub async fn run<T, P, Fut>(
    &self,
    key: &str,
    cancel: &CancelToken,
    patch: P,
    write: Fut,
  ) -> Result<T, ApiError>
  where
    T: Serialize + DeserializeOwned,
    P: FnOnce(Option<T>) -> Option<T>,
    Fut: Future<Output = Result<T, ApiError>>,
  {
    let snapshot = self.store.read(key).map(|e| e.data);
    let current: Option<T> = snapshot
      .as_ref()
      .and_then(|v| serde_json::from_value(v.clone()).ok());

    // The optimistic write is synchronous: it lands before any network I/O.
    let intent = match patch(current) {
      Some(optimistic) => MutationIntent {
        base_version: Some(self.store.write(key, &optimistic)?),
        snapshot,
        wrote_optimistic: true,
      },
      None => MutationIntent {
        base_version: self.store.version(key),
        snapshot,
        wrote_optimistic: false,
      },
    };

    let result = tokio::select! {
      biased;
      _ = cancel.clone().cancelled() => Err(ApiError::Cancelled),
      result = write => result,
    };

    let settled = self.settle(key, intent, result);

    // The settle above never touches staleness; this is the single
    // invalidation for this mutation, success or failure.
    self.invalidator.invalidate(key);
    settled
  }

  fn settle<T>(
    &self,
    key: &str,
    intent: MutationIntent,
    result: Result<T, ApiError>,
  ) -> Result<T, ApiError>
  where
    T: Serialize,
  {
    match result {
      Ok(fresh) => {
        if self.store.version(key) == intent.base_version {
          match serde_json::to_value(&fresh) {
            Ok(value) => {
              self.store.put(key, value);
            }
            Err(err) => return Err(ApiError::Decode(err)),
          }
        } else {
          debug!(key, "skipping commit, key advanced past this mutation");
        }
        Ok(fresh)
      }
      Err(ApiError::Cancelled) => {
        debug!(key, "mutation cancelled in flight");
        Err(ApiError::Cancelled)
      }
      Err(err) => {
        if intent.wrote_optimistic && self.store.version(key) == intent.base_version {
          self.store.restore(key, intent.snapshot);
        } else if intent.wrote_optimistic {
          debug!(key, "skipping rollback, key advanced past this mutation");
        }
        Err(err)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use tokio::sync::oneshot;

  use crate::cancel::CancelSource;

  fn coordinator() -> (MutationCoordinator, Arc<CacheStore>) {
    let store = Arc::new(CacheStore::new());
    (MutationCoordinator::new(Arc::clone(&store)), store)
  }

  fn server_error() -> ApiError {
    ApiError::Server {
      status: 500,
      message: "internal".to_string(),
    }
  }

  #[tokio::test]
  async fn test_commit_replaces_optimistic_value() {
    let (coordinator, store) = coordinator();
    store.put("settings:detail", json!({"theme": "light"}));

    let result = coordinator
      .run(
        "settings:detail",
        &CancelToken::never(),
        |_: Option<Value>| Some(json!({"theme": "dark"})),
        async { Ok(json!({"theme": "dark", "updated_at": "server"})) },
      )
      .await
      .unwrap();

    assert_eq!(result, json!({"theme": "dark", "updated_at": "server"}));
    let entry = store.read("settings:detail").unwrap();
    assert_eq!(entry.data, result);
    assert!(entry.is_stale, "settled mutation must invalidate its key");
  }

  #[tokio::test]
  async fn test_optimistic_value_is_visible_before_settle() {
    let (coordinator, store) = coordinator();
    store.put("settings:detail", json!({"theme": "light"}));

    let (release, gate) = oneshot::channel::<()>();
    let inner = coordinator.clone();
    let task = tokio::spawn(async move {
      inner
        .run(
          "settings:detail",
          &CancelToken::never(),
          |_: Option<Value>| Some(json!({"theme": "dark"})),
          async move {
            gate.await.ok();
            Ok(json!({"theme": "dark"}))
          },
        )
        .await
    });

    tokio::task::yield_now().await;
    let entry = store.read("settings:detail").unwrap();
    assert_eq!(entry.data, json!({"theme": "dark"}));
    assert!(!entry.is_stale, "no invalidation before settle");

    release.send(()).unwrap();
    task.await.unwrap().unwrap();
  }

  #[tokio::test]
  async fn test_rollback_is_exact() {
    let (coordinator, store) = coordinator();
    store.put("settings:detail", json!({"theme": "light", "items_per_page": 20}));

    let result: Result<Value, _> = coordinator
      .run(
        "settings:detail",
        &CancelToken::never(),
        |_: Option<Value>| Some(json!({"theme": "dark", "items_per_page": 20})),
        async { Err(server_error()) },
      )
      .await;

    assert!(matches!(result, Err(ApiError::Server { .. })));
    let entry = store.read("settings:detail").unwrap();
    assert_eq!(entry.data, json!({"theme": "light", "items_per_page": 20}));
    assert!(entry.is_stale, "failed mutation must still invalidate");
  }

  #[tokio::test]
  async fn test_rollback_of_absent_entry_removes_it() {
    let (coordinator, store) = coordinator();

    let result: Result<Value, _> = coordinator
      .run(
        "users:detail:7",
        &CancelToken::never(),
        |_: Option<Value>| Some(json!({"is_active": false})),
        async { Err(server_error()) },
      )
      .await;

    assert!(result.is_err());
    assert!(store.read("users:detail:7").is_none());
  }

  #[tokio::test]
  async fn test_no_optimistic_write_when_patch_declines() {
    let (coordinator, store) = coordinator();

    let result = coordinator
      .run(
        "settings:detail",
        &CancelToken::never(),
        |current: Option<Value>| {
          assert!(current.is_none());
          None
        },
        async { Ok(json!({"theme": "light"})) },
      )
      .await
      .unwrap();

    assert_eq!(result, json!({"theme": "light"}));
    assert_eq!(store.read("settings:detail").unwrap().data, result);
  }

  #[tokio::test]
  async fn test_late_failure_does_not_clobber_newer_mutation() {
    let (coordinator, store) = coordinator();
    store.put("settings:detail", json!({"theme": "light"}));

    let (release, gate) = oneshot::channel::<()>();
    let first = coordinator.clone();
    let task = tokio::spawn(async move {
      first
        .run(
          "settings:detail",
          &CancelToken::never(),
          |_: Option<Value>| Some(json!({"theme": "dark"})),
          async move {
            gate.await.ok();
            Err::<Value, _>(server_error())
          },
        )
        .await
    });
    tokio::task::yield_now().await;

    // Second mutation on the same key completes while the first is in
    // flight; it snapshots the visible (optimistic) value.
    coordinator
      .run(
        "settings:detail",
        &CancelToken::never(),
        |current: Option<Value>| {
          assert_eq!(current, Some(json!({"theme": "dark"})));
          Some(json!({"theme": "auto"}))
        },
        async { Ok(json!({"theme": "auto"})) },
      )
      .await
      .unwrap();

    release.send(()).unwrap();
    let first_result = task.await.unwrap();
    assert!(first_result.is_err());

    // The first mutation's rollback must not restore over the second's
    // committed state.
    assert_eq!(
      store.read("settings:detail").unwrap().data,
      json!({"theme": "auto"})
    );
  }

  #[tokio::test]
  async fn test_late_commit_does_not_clobber_newer_mutation() {
    let (coordinator, store) = coordinator();
    store.put("k", json!("v0"));

    let (release, gate) = oneshot::channel::<()>();
    let first = coordinator.clone();
    let task = tokio::spawn(async move {
      first
        .run(
          "k",
          &CancelToken::never(),
          |_: Option<Value>| Some(json!("first-optimistic")),
          async move {
            gate.await.ok();
            Ok(json!("first-server"))
          },
        )
        .await
    });
    tokio::task::yield_now().await;

    store.put("k", json!("second"));

    release.send(()).unwrap();
    task.await.unwrap().unwrap();

    assert_eq!(store.read("k").unwrap().data, json!("second"));
  }

  #[tokio::test]
  async fn test_cancelled_mutation_neither_commits_nor_rolls_back() {
    let (coordinator, store) = coordinator();
    store.put("settings:detail", json!({"theme": "light"}));

    let source = CancelSource::new();
    let token = source.token();

    let (_release, gate) = oneshot::channel::<()>();
    let inner = coordinator.clone();
    let task = tokio::spawn(async move {
      inner
        .run(
          "settings:detail",
          &token,
          |_: Option<Value>| Some(json!({"theme": "dark"})),
          async move {
            gate.await.ok();
            Ok(json!({"theme": "dark"}))
          },
        )
        .await
    });
    tokio::task::yield_now().await;

    source.cancel();
    let result = task.await.unwrap();
    assert!(matches!(result, Err(ApiError::Cancelled)));

    // The optimistic value stays, but stale: the next read refetches.
    let entry = store.read("settings:detail").unwrap();
    assert_eq!(entry.data, json!({"theme": "dark"}));
    assert!(entry.is_stale);
  }
}

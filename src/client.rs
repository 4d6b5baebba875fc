//! Session-scoped client: cache, mutations and bulk operations behind one
//! handle.
//!
//! One `MaktabaClient` is constructed when a session starts and torn down
//! when it ends; everything that needs the shared cache holds a reference to
//! this instance. Reads are cache-first with stale-triggered refetch; writes
//! go through the optimistic mutation coordinator; multi-user administrative
//! actions go through the bulk runner. Settled operations surface exactly one
//! notification on the stream handed out at construction.

use chrono::Duration;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::types::{
  Paginated, SettingsSection, SettingsUpdate, UserFilters, UserSettings, UserSummary,
};
use crate::api::{ApiError, Backend};
use crate::bulk::{BulkOperationKind, BulkReport, BulkRunner};
use crate::cache::{CacheStore, InvalidationScheduler, QueryKey};
use crate::cancel::CancelToken;
use crate::keys::LibraryQueryKey;
use crate::mutation::MutationCoordinator;
use crate::notify::{Notification, Notifier};
use crate::retry::{with_retry, RetryPolicy};

/// How long a cached value counts as fresh.
const DEFAULT_STALE_TIME_MINUTES: i64 = 5;

pub struct MaktabaClient {
  api: Arc<dyn Backend>,
  store: Arc<CacheStore>,
  coordinator: MutationCoordinator,
  bulk: BulkRunner,
  invalidator: InvalidationScheduler,
  notifier: Notifier,
  stale_time: Duration,
}

impl MaktabaClient {
  /// Create the client and the notification stream its operations feed.
  pub fn new(api: Arc<dyn Backend>) -> (Self, mpsc::UnboundedReceiver<Notification>) {
    let store = Arc::new(CacheStore::new());
    let (notifier, notifications) = Notifier::channel();

    let client = Self {
      coordinator: MutationCoordinator::new(Arc::clone(&store)),
      bulk: BulkRunner::new(Arc::clone(&store), notifier.clone()),
      invalidator: InvalidationScheduler::new(Arc::clone(&store)),
      api,
      store,
      notifier,
      stale_time: Duration::minutes(DEFAULT_STALE_TIME_MINUTES),
    };
    (client, notifications)
  }

  /// Override the freshness window.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Force the next read of `key` back to the backend.
  pub fn invalidate(&self, key: &LibraryQueryKey) {
    self.invalidator.invalidate(&key.cache_key());
  }

  /// Force every query in a key family back to the backend.
  pub fn invalidate_family(&self, family: &'static str) {
    self.invalidator.invalidate_family(family);
  }

  /// Current user's settings, cache-first.
  pub async fn settings(&self) -> Result<UserSettings, ApiError> {
    let api = Arc::clone(&self.api);
    self
      .cached_fetch(&LibraryQueryKey::Settings, move || {
        let api = Arc::clone(&api);
        async move { api.get_settings().await }
      })
      .await
  }

  /// One page of the user list, cache-first.
  pub async fn users(&self, filters: UserFilters) -> Result<Paginated<UserSummary>, ApiError> {
    let key = LibraryQueryKey::UserList {
      filters: filters.clone(),
    };
    let api = Arc::clone(&self.api);
    self
      .cached_fetch(&key, move || {
        let api = Arc::clone(&api);
        let filters = filters.clone();
        async move { api.list_users(&filters).await }
      })
      .await
  }

  /// Apply a partial settings update optimistically.
  ///
  /// The predicted result is visible in the cache before the backend
  /// confirms; a failure restores the pre-mutation snapshot exactly.
  pub async fn update_settings(
    &self,
    update: SettingsUpdate,
    cancel: &CancelToken,
  ) -> Result<UserSettings, ApiError> {
    let key = LibraryQueryKey::Settings.cache_key();

    let api = Arc::clone(&self.api);
    let remote_update = update.clone();
    let write = with_retry(RetryPolicy::mutation_path(), move || {
      let api = Arc::clone(&api);
      let update = remote_update.clone();
      async move { api.update_settings(&update).await }
    });

    let result = self
      .coordinator
      .run(
        &key,
        cancel,
        move |current: Option<UserSettings>| current.map(|cur| update.apply_to(&cur)),
        write,
      )
      .await;

    match &result {
      Ok(_) => self.notifier.success(
        "Settings saved",
        "Your preferences have been updated successfully.",
      ),
      Err(ApiError::Cancelled) => {}
      Err(err) => self.notifier.error("Save failed", err.user_message()),
    }
    result
  }

  /// Reset one settings section (or all of them) to server defaults.
  ///
  /// Defaults are not predictable locally, so nothing is published
  /// optimistically; the server's response is committed as ground truth.
  pub async fn reset_settings(
    &self,
    section: SettingsSection,
    cancel: &CancelToken,
  ) -> Result<UserSettings, ApiError> {
    let key = LibraryQueryKey::Settings.cache_key();

    let api = Arc::clone(&self.api);
    let write = with_retry(RetryPolicy::mutation_path(), move || {
      let api = Arc::clone(&api);
      async move { api.reset_settings(section).await }
    });

    let result = self
      .coordinator
      .run(&key, cancel, |_: Option<UserSettings>| None, write)
      .await;

    match &result {
      Ok(_) => {
        let scope = match section {
          SettingsSection::All => "All settings".to_string(),
          section => format!("{section} settings"),
        };
        self
          .notifier
          .success("Settings reset", format!("{scope} have been reset to defaults."));
      }
      Err(ApiError::Cancelled) => {}
      Err(err) => self.notifier.error("Reset failed", err.user_message()),
    }
    result
  }

  /// Activate or deactivate many users at once.
  pub async fn bulk_set_active(
    &self,
    ids: Vec<String>,
    is_active: bool,
    cancel: &CancelToken,
  ) -> Result<BulkReport, ApiError> {
    let kind = if is_active {
      BulkOperationKind::Activate
    } else {
      BulkOperationKind::Deactivate
    };

    let api = Arc::clone(&self.api);
    self
      .bulk
      .run(kind, ids, cancel, LibraryQueryKey::USERS_FAMILY, move |id| {
        let api = Arc::clone(&api);
        async move {
          with_retry(RetryPolicy::mutation_path(), move || {
            let api = Arc::clone(&api);
            let id = id.clone();
            async move { api.set_user_status(&id, is_active).await.map(|_| ()) }
          })
          .await
        }
      })
      .await
  }

  /// Delete many users at once.
  pub async fn bulk_delete(
    &self,
    ids: Vec<String>,
    cancel: &CancelToken,
  ) -> Result<BulkReport, ApiError> {
    let api = Arc::clone(&self.api);
    self
      .bulk
      .run(
        BulkOperationKind::Delete,
        ids,
        cancel,
        LibraryQueryKey::USERS_FAMILY,
        move |id| {
          let api = Arc::clone(&api);
          async move {
            with_retry(RetryPolicy::mutation_path(), move || {
              let api = Arc::clone(&api);
              let id = id.clone();
              async move { api.delete_user(&id).await.map(|_| ()) }
            })
            .await
          }
        },
      )
      .await
  }

  async fn cached_fetch<T, F, Fut>(&self, key: &LibraryQueryKey, fetcher: F) -> Result<T, ApiError>
  where
    T: serde::Serialize + serde::de::DeserializeOwned,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ApiError>>,
  {
    let cache_key = key.cache_key();

    if self.store.is_fresh(&cache_key, self.stale_time) {
      if let Some(cached) = self.store.read_as::<T>(&cache_key) {
        debug!(key = %cache_key, "cache hit");
        return Ok(cached);
      }
    }

    debug!(query = %key.description(), "fetching from backend");
    let fresh = with_retry(RetryPolicy::read_path(), fetcher).await?;
    self.store.write(&cache_key, &fresh)?;
    Ok(fresh)
  }
}

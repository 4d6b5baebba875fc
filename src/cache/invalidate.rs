//! Invalidation scheduling.
//!
//! Invalidation never deletes data; it marks entries stale so the next read
//! is forced back to the backend for ground truth. It is requested only after
//! a mutation has fully settled (committed or rolled back), never while an
//! optimistic write is still in flight.

use std::sync::Arc;
use tracing::debug;

use super::store::CacheStore;

/// Marks cache entries stale once mutations settle.
#[derive(Clone)]
pub struct InvalidationScheduler {
  store: Arc<CacheStore>,
}

impl InvalidationScheduler {
  pub fn new(store: Arc<CacheStore>) -> Self {
    Self { store }
  }

  /// Mark a single key stale.
  pub fn invalidate(&self, key: &str) {
    debug!(key, "invalidating cache entry");
    self.store.mark_stale(key);
  }

  /// Mark a whole key family stale (e.g. every cached user list page).
  pub fn invalidate_family(&self, prefix: &str) {
    debug!(prefix, "invalidating cache family");
    self.store.mark_stale_prefix(prefix);
  }
}

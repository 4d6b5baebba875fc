//! In-memory cache store.
//!
//! One entry per normalized query key: the last known value, when it was
//! fetched, whether it has been marked stale, and a version counter. Versions
//! increase monotonically across the whole store on every write; a mutation
//! records the version of its own optimistic write and may only commit or
//! roll back while that version is still current. The store is memory
//! resident only and rebuilt from the backend each session.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// A cached value together with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub data: Value,
  pub fetched_at: DateTime<Utc>,
  pub is_stale: bool,
  pub version: u64,
}

struct Inner {
  entries: HashMap<String, CacheEntry>,
  next_version: u64,
}

/// Addressable map from query key to last known entity snapshot.
///
/// Constructed once per session and shared by reference; there is no global
/// instance. All operations are synchronous and complete within one
/// cooperative turn, so readers may observe a value at any point of its
/// lifecycle (ground truth, optimistic guess, or rolled-back snapshot).
pub struct CacheStore {
  inner: Mutex<Inner>,
}

impl CacheStore {
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(Inner {
        entries: HashMap::new(),
        next_version: 1,
      }),
    }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
    // A poisoned lock only means another holder panicked between two plain
    // map operations; the map itself is still structurally valid.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Current entry for `key`, if any.
  pub fn read(&self, key: &str) -> Option<CacheEntry> {
    self.lock().entries.get(key).cloned()
  }

  /// Current value for `key`, decoded. Undecodable entries count as absent.
  pub fn read_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let entry = self.read(key)?;
    match serde_json::from_value(entry.data) {
      Ok(value) => Some(value),
      Err(err) => {
        warn!(key, %err, "discarding undecodable cache entry");
        None
      }
    }
  }

  /// Store `data` under `key`, returning the entry's new version.
  pub fn put(&self, key: &str, data: Value) -> u64 {
    let mut inner = self.lock();
    let version = inner.next_version;
    inner.next_version += 1;
    inner.entries.insert(
      key.to_string(),
      CacheEntry {
        data,
        fetched_at: Utc::now(),
        is_stale: false,
        version,
      },
    );
    version
  }

  /// Serialize and store `value` under `key`.
  pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<u64, serde_json::Error> {
    Ok(self.put(key, serde_json::to_value(value)?))
  }

  /// Roll back `key` to a previously captured snapshot, verbatim.
  ///
  /// An absent snapshot means the key had no entry before the mutation, so
  /// the entry is removed again.
  pub fn restore(&self, key: &str, snapshot: Option<Value>) {
    match snapshot {
      Some(data) => {
        self.put(key, data);
      }
      None => self.remove(key),
    }
    debug!(key, "cache entry rolled back");
  }

  /// Version of the current entry for `key`, if any.
  pub fn version(&self, key: &str) -> Option<u64> {
    self.lock().entries.get(key).map(|e| e.version)
  }

  /// Mark the entry for `key` stale so the next read refetches.
  pub fn mark_stale(&self, key: &str) {
    if let Some(entry) = self.lock().entries.get_mut(key) {
      entry.is_stale = true;
    }
  }

  /// Mark every entry whose key starts with `prefix` stale.
  pub fn mark_stale_prefix(&self, prefix: &str) {
    let mut inner = self.lock();
    for (key, entry) in inner.entries.iter_mut() {
      if key.starts_with(prefix) {
        entry.is_stale = true;
      }
    }
  }

  pub fn remove(&self, key: &str) {
    self.lock().entries.remove(key);
  }

  /// Whether `key` holds a value that is neither stale nor older than
  /// `stale_time`.
  pub fn is_fresh(&self, key: &str, stale_time: Duration) -> bool {
    self
      .lock()
      .entries
      .get(key)
      .map(|e| !e.is_stale && Utc::now() - e.fetched_at <= stale_time)
      .unwrap_or(false)
  }
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_write_read_roundtrip() {
    let store = CacheStore::new();
    store.write("settings:detail", &json!({"theme": "light"})).unwrap();

    let entry = store.read("settings:detail").unwrap();
    assert_eq!(entry.data, json!({"theme": "light"}));
    assert!(!entry.is_stale);
  }

  #[test]
  fn test_versions_increase_on_every_write() {
    let store = CacheStore::new();
    let v1 = store.put("k", json!(1));
    let v2 = store.put("k", json!(2));
    let v3 = store.put("other", json!(3));

    assert!(v2 > v1);
    assert!(v3 > v2);
    assert_eq!(store.version("k"), Some(v2));
  }

  #[test]
  fn test_restore_verbatim() {
    let store = CacheStore::new();
    store.put("k", json!({"theme": "light"}));
    let snapshot = store.read("k").map(|e| e.data);

    store.put("k", json!({"theme": "dark"}));
    store.restore("k", snapshot);

    assert_eq!(store.read("k").unwrap().data, json!({"theme": "light"}));
  }

  #[test]
  fn test_restore_absent_snapshot_removes_entry() {
    let store = CacheStore::new();
    store.put("k", json!(1));
    store.restore("k", None);

    assert!(store.read("k").is_none());
    assert_eq!(store.version("k"), None);
  }

  #[test]
  fn test_mark_stale_prefix_only_touches_family() {
    let store = CacheStore::new();
    store.put("users:list:abc", json!([]));
    store.put("users:detail:7", json!({}));
    store.put("settings:detail", json!({}));

    store.mark_stale_prefix("users");

    assert!(store.read("users:list:abc").unwrap().is_stale);
    assert!(store.read("users:detail:7").unwrap().is_stale);
    assert!(!store.read("settings:detail").unwrap().is_stale);
  }

  #[test]
  fn test_freshness() {
    let store = CacheStore::new();
    store.put("k", json!(1));

    assert!(store.is_fresh("k", Duration::minutes(5)));
    assert!(!store.is_fresh("k", Duration::zero() - Duration::seconds(1)));
    assert!(!store.is_fresh("missing", Duration::minutes(5)));

    store.mark_stale("k");
    assert!(!store.is_fresh("k", Duration::minutes(5)));
  }
}

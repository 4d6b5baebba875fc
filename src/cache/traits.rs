//! Core trait for addressing the cache.

/// A query that can be cached.
///
/// Implementors produce a normalized, stable key so that equivalent queries
/// share one cache slot, plus a family prefix so a whole group of related
/// keys ("everything about users") can be invalidated at once.
pub trait QueryKey {
  /// Normalized cache key (e.g. `settings:detail`, `users:list:<hash>`).
  fn cache_key(&self) -> String;

  /// Key-family prefix used for bulk invalidation (e.g. `users`).
  fn family(&self) -> &'static str;

  /// Human-readable description for logs.
  fn description(&self) -> String;
}

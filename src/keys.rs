//! Cache keys for the queries this client issues.

use sha2::{Digest, Sha256};

use crate::api::types::UserFilters;
use crate::cache::QueryKey;

/// Query key for every cacheable read.
#[derive(Clone, Debug)]
pub enum LibraryQueryKey {
  /// The current user's settings document
  Settings,
  /// One page of the user list under a filter combination
  UserList { filters: UserFilters },
  /// A single user by id
  UserDetail { id: String },
}

impl LibraryQueryKey {
  pub const SETTINGS_FAMILY: &'static str = "settings";
  pub const USERS_FAMILY: &'static str = "users";
}

impl QueryKey for LibraryQueryKey {
  fn cache_key(&self) -> String {
    match self {
      Self::Settings => "settings:detail".to_string(),
      Self::UserList { filters } => format!("users:list:{}", hash_filters(filters)),
      Self::UserDetail { id } => format!("users:detail:{}", id),
    }
  }

  fn family(&self) -> &'static str {
    match self {
      Self::Settings => Self::SETTINGS_FAMILY,
      Self::UserList { .. } | Self::UserDetail { .. } => Self::USERS_FAMILY,
    }
  }

  fn description(&self) -> String {
    match self {
      Self::Settings => "user settings".to_string(),
      Self::UserList { filters } => format!("user list page {}", filters.page),
      Self::UserDetail { id } => format!("user {}", id),
    }
  }
}

/// Hash a filter combination into a stable, fixed-length key segment.
///
/// Filters are normalized first so that trivially different spellings of the
/// same query share a cache slot.
fn hash_filters(filters: &UserFilters) -> String {
  let normalized = UserFilters {
    search: filters
      .search
      .as_deref()
      .map(|s| s.trim().to_lowercase())
      .filter(|s| !s.is_empty()),
    ..filters.clone()
  };

  // Field order in the struct is declaration order, so this is stable.
  let canonical = serde_json::to_string(&normalized).unwrap_or_default();

  let mut hasher = Sha256::new();
  hasher.update(canonical.as_bytes());
  hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_equivalent_filters_share_a_key() {
    let a = LibraryQueryKey::UserList {
      filters: UserFilters {
        search: Some("  Amina ".to_string()),
        ..UserFilters::default()
      },
    };
    let b = LibraryQueryKey::UserList {
      filters: UserFilters {
        search: Some("amina".to_string()),
        ..UserFilters::default()
      },
    };

    assert_eq!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_different_filters_get_different_keys() {
    let a = LibraryQueryKey::UserList {
      filters: UserFilters::default(),
    };
    let b = LibraryQueryKey::UserList {
      filters: UserFilters {
        is_active: Some(false),
        ..UserFilters::default()
      },
    };

    assert_ne!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_keys_live_under_their_family() {
    let list = LibraryQueryKey::UserList {
      filters: UserFilters::default(),
    };
    let detail = LibraryQueryKey::UserDetail {
      id: "42".to_string(),
    };

    assert!(list.cache_key().starts_with(list.family()));
    assert!(detail.cache_key().starts_with(detail.family()));
    assert_eq!(LibraryQueryKey::Settings.family(), "settings");
  }
}

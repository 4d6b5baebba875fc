//! In-memory query cache.
//!
//! This module provides the shared cache the rest of the crate coordinates
//! around:
//! - One versioned entry per normalized query key
//! - Staleness marking instead of eviction: a stale entry stays readable but
//!   forces the next read back to the backend
//! - No per-key locking; consistency rests on versioned writes and on
//!   invalidation happening only after mutations settle

mod invalidate;
mod store;
mod traits;

pub use invalidate::InvalidationScheduler;
pub use store::{CacheEntry, CacheStore};
pub use traits::QueryKey;

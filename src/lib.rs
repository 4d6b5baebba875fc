//! Client-side data layer for the Maktaba library management system.
//!
//! The web UI above this crate is all presentation; everything stateful
//! lives here:
//! - [`cache`]: in-memory versioned query cache with stale-marking
//!   invalidation
//! - [`mutation`]: optimistic writes with exact rollback
//! - [`bulk`]: multi-user administrative actions settled with per-id
//!   outcomes
//! - [`api`]: HTTP/JSON transport with bearer auth, refresh-once-on-401 and
//!   per-path retry policies
//!
//! A [`client::MaktabaClient`] owns one session's cache and is passed by
//! reference to whatever drives it (the bundled CLI, a UI event loop). There
//! is deliberately no global instance.

pub mod api;
pub mod bulk;
pub mod cache;
pub mod cancel;
pub mod client;
pub mod config;
pub mod keys;
pub mod mutation;
pub mod notify;
pub mod retry;

pub use api::{ApiClient, ApiError, Backend, HttpClient, StaticTokens, TokenProvider};
pub use bulk::{BulkOperationKind, BulkReport, BulkRunner, Outcome};
pub use cache::{CacheEntry, CacheStore, InvalidationScheduler, QueryKey};
pub use cancel::{CancelSource, CancelToken};
pub use client::MaktabaClient;
pub use config::Config;
pub use keys::LibraryQueryKey;
pub use mutation::MutationCoordinator;
pub use notify::{Notification, Notifier, Severity};

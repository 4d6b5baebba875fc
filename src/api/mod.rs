//! Remote API: transport, authentication, typed endpoints and errors.

mod auth;
mod client;
mod error;
mod http;
pub mod types;

pub use auth::{StaticTokens, TokenProvider};
pub use client::{ApiClient, Backend};
pub use error::ApiError;
pub use http::HttpClient;

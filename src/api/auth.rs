//! Bearer-token authentication.
//!
//! Token issuance and refresh live outside this crate; the transport only
//! needs something that can hand it the current access token and, on a 401,
//! produce a fresh one exactly once before the request is replayed.

use async_trait::async_trait;

use super::error::ApiError;

/// Opaque provider of bearer credentials.
#[async_trait]
pub trait TokenProvider: Send + Sync {
  /// Current access token, attached as `Authorization: Bearer <token>`.
  async fn access_token(&self) -> Result<String, ApiError>;

  /// Obtain a replacement access token after the current one was rejected.
  ///
  /// Called at most once per request; the original request is then replayed
  /// with the returned token. A provider with no refresh capability should
  /// return [`ApiError::Auth`].
  async fn refresh(&self) -> Result<String, ApiError>;
}

/// Provider backed by a fixed token (environment variable, CI, tooling).
pub struct StaticTokens {
  token: String,
}

impl StaticTokens {
  pub fn new(token: impl Into<String>) -> Self {
    Self {
      token: token.into(),
    }
  }
}

#[async_trait]
impl TokenProvider for StaticTokens {
  async fn access_token(&self) -> Result<String, ApiError> {
    Ok(self.token.clone())
  }

  async fn refresh(&self) -> Result<String, ApiError> {
    Err(ApiError::Auth(
      "access token rejected and no refresh token is available".to_string(),
    ))
  }
}

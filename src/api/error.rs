//! Error types for the remote API layer.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors surfaced by remote operations.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The request never completed (connectivity loss, DNS failure, timeout).
  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  /// The server rejected the request (4xx). Not retryable.
  #[error("{detail}")]
  Validation { status: u16, detail: String },

  /// The server failed (5xx). Transient.
  #[error("server error ({status}): {message}")]
  Server { status: u16, message: String },

  /// Authentication failed, even after a token refresh.
  #[error("authentication failed: {0}")]
  Auth(String),

  /// The response body could not be decoded.
  #[error("invalid response body: {0}")]
  Decode(#[from] serde_json::Error),

  /// The operation was cancelled by its initiating context.
  #[error("operation cancelled")]
  Cancelled,
}

impl ApiError {
  /// Whether retrying the same request might succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, ApiError::Network(_) | ApiError::Server { .. })
  }

  /// Message suitable for a user-facing notification.
  ///
  /// Server-provided detail is surfaced verbatim for validation failures;
  /// connectivity problems collapse to a generic message.
  pub fn user_message(&self) -> String {
    match self {
      ApiError::Network(_) => "Network error. Please check your connection".to_string(),
      ApiError::Validation { detail, .. } => detail.clone(),
      ApiError::Server { message, .. } => message.clone(),
      ApiError::Auth(msg) => msg.clone(),
      ApiError::Decode(_) => "An unexpected error occurred".to_string(),
      ApiError::Cancelled => "Operation cancelled".to_string(),
    }
  }
}

/// Error body shape used by the backend.
///
/// `detail` is either a plain string or a structured list of field errors
/// (validation failures); `message` is a legacy fallback field.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
  detail: Option<ErrorDetail>,
  message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
  Text(String),
  Fields(Vec<FieldError>),
}

#[derive(Debug, Deserialize)]
struct FieldError {
  msg: String,
}

impl ErrorBody {
  fn into_message(self) -> Option<String> {
    match self.detail {
      Some(ErrorDetail::Text(s)) => Some(s),
      Some(ErrorDetail::Fields(fields)) => fields.into_iter().next().map(|f| f.msg),
      None => self.message,
    }
  }
}

/// Classify a non-success response into an [`ApiError`].
pub(crate) fn classify(status: StatusCode, body: &str) -> ApiError {
  let message = serde_json::from_str::<ErrorBody>(body)
    .ok()
    .and_then(ErrorBody::into_message)
    .unwrap_or_else(|| "An error occurred".to_string());

  if status == StatusCode::UNAUTHORIZED {
    ApiError::Auth(message)
  } else if status.is_client_error() {
    ApiError::Validation {
      status: status.as_u16(),
      detail: message,
    }
  } else {
    ApiError::Server {
      status: status.as_u16(),
      message,
    }
  }
}

//! HTTP/JSON transport for the Maktaba backend.
//!
//! Attaches bearer credentials to every request and transparently handles an
//! expired access token: on a 401 the token provider is asked to refresh and
//! the original request is replayed exactly once.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use super::auth::TokenProvider;
use super::error::{classify, ApiError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Low-level client: URL assembly, auth headers, error classification.
#[derive(Clone)]
pub struct HttpClient {
  http: reqwest::Client,
  /// Base URL including the API prefix, without a trailing slash.
  base_url: String,
  tokens: Arc<dyn TokenProvider>,
}

impl HttpClient {
  pub fn new(base_url: Url, tokens: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
    let http = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()?;

    Ok(Self {
      http,
      base_url: base_url.as_str().trim_end_matches('/').to_string(),
      tokens,
    })
  }

  pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    self.request(Method::GET, path, None, None).await
  }

  pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    Q: Serialize,
  {
    let query = serde_json::to_value(query)?;
    self.request(Method::GET, path, Some(query), None).await
  }

  pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    B: Serialize,
  {
    let body = serde_json::to_value(body)?;
    self.request(Method::POST, path, None, Some(body)).await
  }

  pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    B: Serialize,
  {
    let body = serde_json::to_value(body)?;
    self.request(Method::PUT, path, None, Some(body)).await
  }

  pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    B: Serialize,
  {
    let body = serde_json::to_value(body)?;
    self.request(Method::PATCH, path, None, Some(body)).await
  }

  pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    self.request(Method::DELETE, path, None, None).await
  }

  async fn request<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    query: Option<Value>,
    body: Option<Value>,
  ) -> Result<T, ApiError> {
    trace!(%method, path, "request");

    let token = self.tokens.access_token().await?;
    let response = self
      .send(method.clone(), path, query.as_ref(), body.as_ref(), &token)
      .await?;

    let response = if response.status() == StatusCode::UNAUTHORIZED {
      // Expired access token: refresh once and replay. A second 401 falls
      // through to classification below.
      debug!(path, "access token rejected, refreshing");
      let token = self.tokens.refresh().await?;
      self
        .send(method, path, query.as_ref(), body.as_ref(), &token)
        .await?
    } else {
      response
    };

    Self::decode(response).await
  }

  async fn send(
    &self,
    method: Method,
    path: &str,
    query: Option<&Value>,
    body: Option<&Value>,
    token: &str,
  ) -> Result<reqwest::Response, ApiError> {
    let url = format!("{}{}", self.base_url, path);
    let mut request = self.http.request(method, url).bearer_auth(token);

    if let Some(query) = query {
      request = request.query(query);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    Ok(request.send().await?)
  }

  async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();

    if status.is_success() {
      let bytes = response.bytes().await?;
      Ok(serde_json::from_slice(&bytes)?)
    } else {
      let body = response.text().await.unwrap_or_default();
      Err(classify(status, &body))
    }
  }
}

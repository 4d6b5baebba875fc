//! Typed endpoints of the Maktaba backend.

use async_trait::async_trait;

use super::error::ApiError;
use super::http::HttpClient;
use super::types::{
  MessageResponse, Paginated, ResetRequest, SettingsSection, SettingsUpdate, StatusUpdate,
  UserFilters, UserSettings, UserSummary,
};

/// Remote operations the data layer depends on.
///
/// The production implementation is [`ApiClient`]; tests substitute fakes.
#[async_trait]
pub trait Backend: Send + Sync {
  /// Fetch the current user's settings, creating defaults server-side if
  /// none exist yet.
  async fn get_settings(&self) -> Result<UserSettings, ApiError>;

  /// Partial settings update; returns the full updated entity.
  async fn update_settings(&self, update: &SettingsUpdate) -> Result<UserSettings, ApiError>;

  /// Reset one section (or all) to defaults; returns the full entity.
  async fn reset_settings(&self, section: SettingsSection) -> Result<UserSettings, ApiError>;

  /// List users matching the given filters.
  async fn list_users(&self, filters: &UserFilters) -> Result<Paginated<UserSummary>, ApiError>;

  /// Activate or deactivate a single user.
  async fn set_user_status(&self, id: &str, is_active: bool) -> Result<UserSummary, ApiError>;

  /// Delete a single user. The backend exposes no batch endpoint; bulk
  /// deletion fans out over this per-id call.
  async fn delete_user(&self, id: &str) -> Result<MessageResponse, ApiError>;
}

/// HTTP implementation of [`Backend`].
#[derive(Clone)]
pub struct ApiClient {
  http: HttpClient,
}

impl ApiClient {
  pub fn new(http: HttpClient) -> Self {
    Self { http }
  }
}

#[async_trait]
impl Backend for ApiClient {
  async fn get_settings(&self) -> Result<UserSettings, ApiError> {
    self.http.get("/settings").await
  }

  async fn update_settings(&self, update: &SettingsUpdate) -> Result<UserSettings, ApiError> {
    self.http.put("/settings", update).await
  }

  async fn reset_settings(&self, section: SettingsSection) -> Result<UserSettings, ApiError> {
    self.http.post("/settings/reset", &ResetRequest { section }).await
  }

  async fn list_users(&self, filters: &UserFilters) -> Result<Paginated<UserSummary>, ApiError> {
    self.http.get_query("/users", filters).await
  }

  async fn set_user_status(&self, id: &str, is_active: bool) -> Result<UserSummary, ApiError> {
    self
      .http
      .patch(&format!("/users/{id}/status"), &StatusUpdate { is_active })
      .await
  }

  async fn delete_user(&self, id: &str) -> Result<MessageResponse, ApiError> {
    self.http.delete(&format!("/users/{id}")).await
  }
}

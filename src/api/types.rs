//! Domain types exchanged with the Maktaba backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visual theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  Light,
  Dark,
  Auto,
}

impl FromStr for Theme {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "light" => Ok(Theme::Light),
      "dark" => Ok(Theme::Dark),
      "auto" => Ok(Theme::Auto),
      other => Err(format!("unknown theme: {other}")),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
  pub display_name: Option<String>,
  /// UI language ("en" or "ar")
  pub language: String,
  pub date_format: String,
  pub time_format: String,
  pub default_landing_page: String,
  pub items_per_page: u32,
  pub default_view_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceSettings {
  pub theme: Theme,
  pub interface_density: String,
  pub font_size: String,
  pub animation_speed: String,
  pub show_breadcrumbs: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailNotificationSettings {
  pub system_announcements: bool,
  pub due_date_reminders: bool,
  pub overdue_notifications: bool,
  pub daily_digest: bool,
  /// Local time of day for the digest email, "HH:MM"
  pub digest_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InAppNotificationSettings {
  pub enabled: bool,
  pub sound: bool,
  pub badge_counters: bool,
  pub auto_dismiss_time: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
  pub email: EmailNotificationSettings,
  pub in_app: InAppNotificationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySettings {
  pub two_factor_enabled: bool,
  /// Minutes of inactivity before the session is closed
  pub session_timeout: u32,
  pub last_password_change: Option<DateTime<Utc>>,
}

/// Per-user preferences, one document per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
  pub id: String,
  pub user_id: String,
  pub general: GeneralSettings,
  pub appearance: AppearanceSettings,
  pub notifications: NotificationSettings,
  pub security: SecuritySettings,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Partial settings update: only the provided sections are changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub general: Option<GeneralSettings>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub appearance: Option<AppearanceSettings>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notifications: Option<NotificationSettings>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub security: Option<SecuritySettings>,
}

impl SettingsUpdate {
  /// Merge this update over `current`, predicting the server's result.
  ///
  /// `updated_at` is bumped locally; the server-assigned timestamp replaces
  /// it once the write is confirmed.
  pub fn apply_to(&self, current: &UserSettings) -> UserSettings {
    let mut next = current.clone();
    if let Some(general) = &self.general {
      next.general = general.clone();
    }
    if let Some(appearance) = &self.appearance {
      next.appearance = appearance.clone();
    }
    if let Some(notifications) = &self.notifications {
      next.notifications = notifications.clone();
    }
    if let Some(security) = &self.security {
      next.security = security.clone();
    }
    next.updated_at = Utc::now();
    next
  }
}

/// Settings section addressable by a reset request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsSection {
  General,
  Appearance,
  Notifications,
  Security,
  All,
}

impl fmt::Display for SettingsSection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      SettingsSection::General => "general",
      SettingsSection::Appearance => "appearance",
      SettingsSection::Notifications => "notifications",
      SettingsSection::Security => "security",
      SettingsSection::All => "all",
    };
    f.write_str(name)
  }
}

impl FromStr for SettingsSection {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "general" => Ok(SettingsSection::General),
      "appearance" => Ok(SettingsSection::Appearance),
      "notifications" => Ok(SettingsSection::Notifications),
      "security" => Ok(SettingsSection::Security),
      "all" => Ok(SettingsSection::All),
      other => Err(format!("unknown settings section: {other}")),
    }
  }
}

/// Body of `POST /settings/reset`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResetRequest {
  pub section: SettingsSection,
}

/// A user as listed in administration views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
  pub id: String,
  pub email: String,
  pub full_name: String,
  pub arabic_name: Option<String>,
  pub role: String,
  pub user_type: String,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

/// Filters for the user list query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFilters {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
  pub page: u32,
  pub page_size: u32,
}

impl Default for UserFilters {
  fn default() -> Self {
    Self {
      search: None,
      role: None,
      user_type: None,
      is_active: None,
      page: 1,
      page_size: 20,
    }
  }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub items: Vec<T>,
  pub total: u64,
  pub page: u32,
  pub page_size: u32,
  pub total_pages: u32,
}

/// Acknowledgement body returned by delete-style endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
  pub message: String,
}

/// Body of `PATCH /users/{id}/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdate {
  pub is_active: bool,
}

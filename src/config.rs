//! Client configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config file not found: {0}")]
  NotFound(PathBuf),

  #[error(
    "no configuration file found. Create one at ~/.config/maktaba/config.yaml\n\
     See config.example.yaml for the format."
  )]
  NoConfigFile,

  #[error("failed to read config file {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("invalid backend URL {url}: {source}")]
  InvalidUrl {
    url: String,
    #[source]
    source: url::ParseError,
  },

  #[error("API token not found. Set MAKTABA_TOKEN or MAKTABA_API_TOKEN environment variable.")]
  MissingToken,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  /// Minutes before cached data is considered stale (default 5)
  pub stale_time_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  /// Base URL including the API prefix (e.g. "https://library.example/api/v1")
  pub url: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./maktaba.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/maktaba/config.yaml
  /// 4. ~/.config/maktaba/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(ConfigError::NotFound(p.to_path_buf()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(ConfigError::NoConfigFile),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("maktaba.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("maktaba").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Parsed backend base URL.
  pub fn base_url(&self) -> Result<Url, ConfigError> {
    Url::parse(&self.backend.url).map_err(|source| ConfigError::InvalidUrl {
      url: self.backend.url.clone(),
      source,
    })
  }

  /// Get the API token from environment variables.
  ///
  /// Checks MAKTABA_TOKEN first, then MAKTABA_API_TOKEN as fallback.
  pub fn api_token() -> Result<String, ConfigError> {
    std::env::var("MAKTABA_TOKEN")
      .or_else(|_| std::env::var("MAKTABA_API_TOKEN"))
      .map_err(|_| ConfigError::MissingToken)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_base_url_parsing() {
    let config = Config {
      backend: BackendConfig {
        url: "https://library.example/api/v1".to_string(),
      },
      stale_time_minutes: None,
    };
    assert!(config.base_url().is_ok());

    let bad = Config {
      backend: BackendConfig {
        url: "not a url".to_string(),
      },
      stale_time_minutes: None,
    };
    assert!(matches!(bad.base_url(), Err(ConfigError::InvalidUrl { .. })));
  }

  #[test]
  fn test_yaml_shape() {
    let config: Config = serde_yaml::from_str(
      "backend:\n  url: https://library.example/api/v1\nstale_time_minutes: 10\n",
    )
    .unwrap();
    assert_eq!(config.stale_time_minutes, Some(10));
  }
}

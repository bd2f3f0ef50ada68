//! Catalogue Manager configuration.
//!
//! TOML-based configuration with environment variable override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub catalogue: CatalogueConfig,
    pub csrs: BackendConfig,
    pub learner_record: BackendConfig,
    pub identity: IdentityConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3005,
        }
    }
}

/// Learning-catalogue upstream (basic-auth credentials)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout_ms: u64,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9001".to_string(),
            username: "user".to_string(),
            password: "password".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// Bearer-token upstream (CSRS, learner-record)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9002".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// OAuth2 identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub url: String,
    pub client_id: String,
    pub client_secret: String,
    /// External URL of this application, used to build the OAuth2
    /// redirect_uri (`{callback_url}/authenticate`).
    pub callback_url: String,
    pub timeout_ms: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            client_id: "catalogue-manager".to_string(),
            client_secret: "changeme".to_string(),
            callback_url: "http://localhost:3005".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// Session cookie settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure: bool,
    pub max_age_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "cm_session".to_string(),
            secure: false,
            max_age_secs: 86_400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = AppConfig::default();
        assert_eq!(config.http.port, 3005);
        assert_eq!(config.catalogue.url, "http://localhost:9001");
        assert_eq!(config.session.cookie_name, "cm_session");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [catalogue]
            url = "https://catalogue.internal"
            username = "editor"

            [http]
            port = 8088
            "#,
        )
        .unwrap();

        assert_eq!(config.catalogue.url, "https://catalogue.internal");
        assert_eq!(config.catalogue.username, "editor");
        // untouched sections keep their defaults
        assert_eq!(config.catalogue.password, "password");
        assert_eq!(config.http.port, 8088);
        assert_eq!(config.csrs.url, "http://localhost:9002");
    }
}

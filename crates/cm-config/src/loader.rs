//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "application.toml",
    "catalogue-manager.toml",
    "./config/config.toml",
    "./config/application.toml",
    "/etc/catalogue-manager/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config);

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("CM_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    fn apply_env_overrides(&self, config: &mut AppConfig) {
        // HTTP
        if let Ok(val) = env::var("CM_HTTP_HOST") {
            config.http.host = val;
        }
        if let Ok(val) = env::var("CM_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.http.port = port;
            }
        }

        // Learning catalogue
        if let Ok(val) = env::var("CM_CATALOGUE_URL") {
            config.catalogue.url = val;
        }
        if let Ok(val) = env::var("CM_CATALOGUE_USERNAME") {
            config.catalogue.username = val;
        }
        if let Ok(val) = env::var("CM_CATALOGUE_PASSWORD") {
            config.catalogue.password = val;
        }

        // CSRS
        if let Ok(val) = env::var("CM_CSRS_URL") {
            config.csrs.url = val;
        }

        // Learner record
        if let Ok(val) = env::var("CM_LEARNER_RECORD_URL") {
            config.learner_record.url = val;
        }

        // Identity / OAuth2
        if let Ok(val) = env::var("CM_IDENTITY_URL") {
            config.identity.url = val;
        }
        if let Ok(val) = env::var("CM_OAUTH_CLIENT_ID") {
            config.identity.client_id = val;
        }
        if let Ok(val) = env::var("CM_OAUTH_CLIENT_SECRET") {
            config.identity.client_secret = val;
        }
        if let Ok(val) = env::var("CM_CALLBACK_URL") {
            config.identity.callback_url = val;
        }

        // One knob for every upstream timeout
        if let Ok(val) = env::var("CM_REQUEST_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse::<u64>() {
                config.catalogue.timeout_ms = timeout;
                config.csrs.timeout_ms = timeout;
                config.learner_record.timeout_ms = timeout;
                config.identity.timeout_ms = timeout;
            }
        }

        // Session
        if let Ok(val) = env::var("CM_SESSION_COOKIE_NAME") {
            config.session.cookie_name = val;
        }
        if let Ok(val) = env::var("CM_SESSION_SECURE") {
            config.session.secure = val.parse().unwrap_or(false);
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_path_wins_over_search() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\nport = 4010").unwrap();

        let config = ConfigLoader::with_path(file.path()).load().unwrap();
        assert_eq!(config.http.port, 4010);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ConfigLoader::with_path("/nonexistent/cm.toml").load().unwrap();
        assert_eq!(config.http.port, 3005);
    }
}

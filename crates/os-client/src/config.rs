//! Client configuration resolved from deployment environment variables.
//!
//! Every variable is optional. Missing or unparseable values fall back to
//! defaults silently; [`AppConfig::validate`] can be used to reject a
//! configuration that resolved to something unusable.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_ENV: &str = "development";
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_API_VERSION: &str = "v1";
const DEFAULT_API_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_APP_TITLE: &str = "Sistema de Ordem de Serviços";
const DEFAULT_APP_URL: &str = "http://localhost:3000";
const DEFAULT_APP_PORT: u16 = 3000;
const DEFAULT_JWT_STORAGE_KEY: &str = "auth_token";
const DEFAULT_REFRESH_TOKEN_KEY: &str = "refresh_token";
const DEFAULT_TOKEN_STORE: &str = ".os-client/tokens.json";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid API base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("request timeout cannot be 0")]
    ZeroTimeout,
}

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment name (`development`, `production`, ...).
    pub env: String,
    pub api: ApiConfig,
    pub app: AppSection,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub version: String,
    pub timeout_ms: u64,
    /// `{base_url}/api/{version}`.
    pub full_url: String,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSection {
    pub title: String,
    pub url: String,
    /// Port of the local development server.
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_storage_key: String,
    pub refresh_token_key: String,
    /// Target of the forced navigation after a 401.
    pub login_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// File backing the persistent token storage.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    /// Create configuration from process environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OS_APP_ENV`: environment name (default: development)
    /// - `OS_API_BASE_URL`: API origin (default: http://localhost:8080)
    /// - `OS_API_VERSION`: API version segment (default: v1)
    /// - `OS_API_TIMEOUT`: request timeout in ms (default: 10000)
    /// - `OS_APP_TITLE`, `OS_APP_URL`, `OS_APP_PORT`: application identity
    /// - `OS_JWT_STORAGE_KEY`, `OS_REFRESH_TOKEN_KEY`: token storage keys
    /// - `OS_LOGIN_URL`: login page (default: `{OS_APP_URL}/login`)
    /// - `OS_TOKEN_STORE`: token storage file (default: .os-client/tokens.json)
    /// - `OS_LOG_LEVEL` or `RUST_LOG`: log filter (default: info)
    /// - `OS_JSON_LOGS`: emit JSON logs (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let base_url = var("OS_API_BASE_URL", DEFAULT_API_BASE_URL);
        let version = var("OS_API_VERSION", DEFAULT_API_VERSION);
        let full_url = format!("{}/api/{}", base_url, version);
        let app_url = var("OS_APP_URL", DEFAULT_APP_URL);
        let login_url = lookup("OS_LOGIN_URL")
            .unwrap_or_else(|| format!("{}/login", app_url.trim_end_matches('/')));

        Self {
            env: var("OS_APP_ENV", DEFAULT_ENV),
            api: ApiConfig {
                base_url,
                version,
                timeout_ms: lookup("OS_API_TIMEOUT")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_API_TIMEOUT_MS),
                full_url,
            },
            app: AppSection {
                title: var("OS_APP_TITLE", DEFAULT_APP_TITLE),
                url: app_url,
                port: lookup("OS_APP_PORT")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_APP_PORT),
            },
            auth: AuthConfig {
                jwt_storage_key: var("OS_JWT_STORAGE_KEY", DEFAULT_JWT_STORAGE_KEY),
                refresh_token_key: var("OS_REFRESH_TOKEN_KEY", DEFAULT_REFRESH_TOKEN_KEY),
                login_url,
            },
            storage: StorageConfig {
                path: PathBuf::from(var("OS_TOKEN_STORE", DEFAULT_TOKEN_STORE)),
            },
            logging: LoggingConfig {
                level: lookup("OS_LOG_LEVEL")
                    .or_else(|| lookup("RUST_LOG"))
                    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
                json: lookup("OS_JSON_LOGS")
                    .map(|v| v.to_lowercase() == "true" || v == "1")
                    .unwrap_or(false),
            },
        }
    }

    pub fn is_development(&self) -> bool {
        self.env == "development"
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    /// Resolve a dotted path such as `"api.timeout_ms"`.
    ///
    /// Returns `None` for any path that does not exist.
    pub fn get(&self, path: &str) -> Option<serde_json::Value> {
        let root = serde_json::to_value(self).ok()?;
        path.split('.')
            .try_fold(&root, |node, key| node.get(key))
            .cloned()
    }

    /// Full URL of an API endpoint: `full_url` followed by `endpoint`.
    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api.full_url, endpoint)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        url::Url::parse(&self.api.full_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.api.full_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.env, "development");
        assert!(config.is_development());
        assert!(!config.is_production());
        assert_eq!(config.api.full_url, "http://localhost:8080/api/v1");
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
        assert_eq!(config.auth.jwt_storage_key, "auth_token");
        assert_eq!(config.auth.refresh_token_key, "refresh_token");
        assert_eq!(config.auth.login_url, "http://localhost:3000/login");
        assert_eq!(config.app.port, 3000);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("OS_APP_ENV", "production"),
            ("OS_API_BASE_URL", "https://os.prefeitura.gov.br"),
            ("OS_API_VERSION", "v2"),
            ("OS_API_TIMEOUT", "2500"),
            ("OS_LOGIN_URL", "https://sso.gov.br/entrar"),
        ]);
        assert!(config.is_production());
        assert_eq!(config.api.full_url, "https://os.prefeitura.gov.br/api/v2");
        assert_eq!(config.api.timeout_ms, 2500);
        assert_eq!(config.auth.login_url, "https://sso.gov.br/entrar");
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = config_from(&[("OS_API_TIMEOUT", "soon"), ("OS_APP_PORT", "-1")]);
        assert_eq!(config.api.timeout_ms, 10_000);
        assert_eq!(config.app.port, 3000);
    }

    #[test]
    fn test_dotted_path_lookup() {
        let config = AppConfig::default();
        assert_eq!(
            config.get("api.timeout_ms"),
            Some(serde_json::json!(10_000))
        );
        assert_eq!(
            config.get("auth.jwt_storage_key"),
            Some(serde_json::json!("auth_token"))
        );
        assert!(config.get("api.missing").is_none());
        assert!(config.get("nope.deeper.still").is_none());
    }

    #[test]
    fn test_api_url() {
        let config = AppConfig::default();
        assert_eq!(config.api_url("/os/1"), "http://localhost:8080/api/v1/os/1");
        assert_eq!(config.api_url(""), "http://localhost:8080/api/v1");
    }

    #[test]
    fn test_validate() {
        assert!(AppConfig::default().validate().is_ok());

        let mut config = AppConfig::default();
        config.api.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));

        let config = config_from(&[("OS_API_BASE_URL", "not a url")]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }
}

//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_API_URL` - Base URL of the remote service (e.g. `https://api.feastly.test/api`)
//!
//! ## Optional
//! - `STOREFRONT_STATE_DIR` - Directory for the persisted session (default: `.storefront`)
//! - `STOREFRONT_REQUEST_TIMEOUT_SECS` - Per-request transport timeout (default: 30)
//! - `STOREFRONT_REFRESH_TIMEOUT_SECS` - Upper bound on a session refresh, `0` for none (default: 30)
//! - `STOREFRONT_LOG_FORMAT` - `pretty` or `json` (default: `pretty`)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_STATE_DIR: &str = ".storefront";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is resolved against (always ends in `/`)
    pub api_url: Url,
    /// Directory holding the persisted credential and session cookies
    pub state_dir: PathBuf,
    /// Transport-level timeout applied to each request
    pub request_timeout: Duration,
    /// Upper bound on a single session refresh; `None` waits indefinitely
    pub refresh_timeout: Option<Duration>,
    /// Log output format
    pub log_format: LogFormat,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the service URL.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url: with_trailing_slash(api_url),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            refresh_timeout: Some(Duration::from_secs(DEFAULT_REFRESH_TIMEOUT_SECS)),
            log_format: LogFormat::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the service URL is missing or any variable
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_env::<Url>("STOREFRONT_API_URL", &get_required_env("STOREFRONT_API_URL")?)?;
        let mut config = Self::new(api_url);

        if let Some(dir) = get_optional_env("STOREFRONT_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }

        let request_secs = get_env_or_default(
            "STOREFRONT_REQUEST_TIMEOUT_SECS",
            &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
        );
        config.request_timeout =
            Duration::from_secs(parse_env("STOREFRONT_REQUEST_TIMEOUT_SECS", &request_secs)?);

        let refresh_secs = get_env_or_default(
            "STOREFRONT_REFRESH_TIMEOUT_SECS",
            &DEFAULT_REFRESH_TIMEOUT_SECS.to_string(),
        );
        config.refresh_timeout =
            match parse_env::<u64>("STOREFRONT_REFRESH_TIMEOUT_SECS", &refresh_secs)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            };

        config.log_format = parse_env(
            "STOREFRONT_LOG_FORMAT",
            &get_env_or_default("STOREFRONT_LOG_FORMAT", "pretty"),
        )?;

        Ok(config)
    }
}

/// `Url::join` drops the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_appends_trailing_slash() {
        let config = ClientConfig::new(Url::parse("https://api.feastly.test/api").unwrap());
        assert_eq!(config.api_url.as_str(), "https://api.feastly.test/api/");
        assert_eq!(
            config.api_url.join("auth/login").unwrap().as_str(),
            "https://api.feastly.test/api/auth/login"
        );
    }

    #[test]
    fn test_new_defaults() {
        let config = ClientConfig::new(Url::parse("http://localhost:5000/").unwrap());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.refresh_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.state_dir, PathBuf::from(".storefront"));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_parse_env_reports_key() {
        let err = parse_env::<u64>("STOREFRONT_REQUEST_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("STOREFRONT_REQUEST_TIMEOUT_SECS"));
    }
}

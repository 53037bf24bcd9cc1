//! Cart client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TIMBERLINE_API_URL` - Base URL of the remote cart API (e.g., `https://api.timberline.test/v1/`)
//!
//! ## Optional
//! - `TIMBERLINE_STORAGE_DIR` - Directory for the durable key-value store (default: .timberline)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (e.g., production)

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

const DEFAULT_STORAGE_DIR: &str = ".timberline";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Remote cart API configuration
    pub api: ApiConfig,
    /// Directory backing the durable key-value store
    pub storage_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Remote cart API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; always ends with a `/` so relative endpoint paths join under it.
    pub base_url: Url,
}

impl ApiConfig {
    /// Build an API configuration from a base URL string.
    ///
    /// A missing trailing slash is added so that `cart` resolves to
    /// `{base}/cart` rather than replacing the last path segment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse or is not HTTP(S).
    pub fn from_base_url(raw: &str) -> Result<Self, ConfigError> {
        let invalid =
            |reason: String| ConfigError::InvalidEnvVar("TIMBERLINE_API_URL".to_string(), reason);

        let mut base_url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base_url.scheme())));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { base_url })
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = get_required(&lookup, "TIMBERLINE_API_URL")?;
        let api = ApiConfig::from_base_url(&api_url)?;
        let storage_dir = PathBuf::from(get_or_default(
            &lookup,
            "TIMBERLINE_STORAGE_DIR",
            DEFAULT_STORAGE_DIR,
        ));

        Ok(Self {
            api,
            storage_dir,
            sentry_dsn: get_optional(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn get_required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get_optional(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional variable, treating blank values as unset.
fn get_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Get a variable with a default value.
fn get_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get_optional(lookup, key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_api_url() {
        let err = StorefrontConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingEnvVar(ref key) if key == "TIMBERLINE_API_URL")
        );
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::from_lookup(lookup_from(&[(
            "TIMBERLINE_API_URL",
            "https://api.timberline.test/v1",
        )]))
        .unwrap();
        assert_eq!(config.storage_dir, PathBuf::from(".timberline"));
        assert!(config.sentry_dsn.is_none());
        assert!(config.sentry_environment.is_none());
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let api = ApiConfig::from_base_url("https://api.timberline.test/v1").unwrap();
        assert_eq!(api.base_url.as_str(), "https://api.timberline.test/v1/");
        assert_eq!(
            api.base_url.join("cart").unwrap().as_str(),
            "https://api.timberline.test/v1/cart"
        );
    }

    #[test]
    fn test_invalid_scheme() {
        let err = ApiConfig::from_base_url("ftp://files.timberline.test").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_blank_optional_values_are_unset() {
        let config = StorefrontConfig::from_lookup(lookup_from(&[
            ("TIMBERLINE_API_URL", "http://localhost:8000/api/"),
            ("TIMBERLINE_STORAGE_DIR", "/var/lib/timberline"),
            ("SENTRY_DSN", "  "),
            ("SENTRY_ENVIRONMENT", "staging"),
        ]))
        .unwrap();
        assert_eq!(config.storage_dir, PathBuf::from("/var/lib/timberline"));
        assert!(config.sentry_dsn.is_none());
        assert_eq!(config.sentry_environment.as_deref(), Some("staging"));
    }
}

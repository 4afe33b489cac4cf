//! Sync engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARRYOVER_REMOTE_URL` - Base URL of the remote persistence API
//! - `CARRYOVER_REMOTE_TOKEN` - Bearer token for the remote persistence API (high entropy)
//!
//! ## Optional
//! - `CARRYOVER_LOCAL_DIR` - Directory for guest collections (default: .carryover)
//! - `CARRYOVER_LOCAL_CAPACITY` - Max entries kept per guest collection (default: 100)
//! - `CARRYOVER_REQUEST_TIMEOUT_SECS` - Remote request timeout (default: 10)
//! - `CARRYOVER_CATALOG_CACHE_CAPACITY` - Max cached catalog entries (default: 1000)
//! - `CARRYOVER_CATALOG_CACHE_TTL_SECS` - Catalog entry lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_TOKEN_LENGTH: usize = 24;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote persistence API configuration
    pub remote: RemoteConfig,
    /// Local (guest) persistence configuration
    pub local: LocalConfig,
    /// Catalog cache configuration
    pub catalog: CatalogConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Remote persistence API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Base URL (e.g., `https://api.example.com/v1/`)
    pub base_url: Url,
    /// Bearer token
    pub token: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Local persistence configuration.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Directory holding one JSON document per collection kind
    pub dir: PathBuf,
    /// Max entries kept per collection
    pub capacity: usize,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".carryover"),
            capacity: 100,
        }
    }
}

/// Catalog cache configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Max cached entries
    pub capacity: u64,
    /// Entry lifetime
    pub ttl: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::from_secs(300),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the remote token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            remote: RemoteConfig::from_env()?,
            local: LocalConfig::from_env()?,
            catalog: CatalogConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl RemoteConfig {
    /// Load only the remote API settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL or token is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_base_url(
            &get_required_env("CARRYOVER_REMOTE_URL")?,
            "CARRYOVER_REMOTE_URL",
        )?;
        let token = get_validated_secret("CARRYOVER_REMOTE_TOKEN")?;
        let timeout = Duration::from_secs(get_parsed_env("CARRYOVER_REQUEST_TIMEOUT_SECS", 10)?);

        Ok(Self {
            base_url,
            token,
            timeout,
        })
    }

    /// Returns the bearer header value for the remote API.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }
}

impl LocalConfig {
    /// Load only the local persistence settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let dir = get_optional_env("CARRYOVER_LOCAL_DIR").map_or(defaults.dir, PathBuf::from);
        let capacity = get_parsed_env("CARRYOVER_LOCAL_CAPACITY", defaults.capacity)?;
        if capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CARRYOVER_LOCAL_CAPACITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self { dir, capacity })
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            capacity: get_parsed_env("CARRYOVER_CATALOG_CACHE_CAPACITY", defaults.capacity)?,
            ttl: Duration::from_secs(get_parsed_env(
                "CARRYOVER_CATALOG_CACHE_TTL_SECS",
                defaults.ttl.as_secs(),
            )?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable parsed into `T`, or a default when unset.
fn get_parsed_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Parse a base URL, ensuring a trailing slash so relative joins keep the path.
fn parse_base_url(raw: &str, var_name: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is long enough, not a placeholder, and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_TOKEN_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }

    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real API tokens have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-token-goes-right-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_too_short() {
        let result = validate_secret_strength("aB3$xY9!", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("https://api.example.com/v1", "TEST_URL").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/");

        let url = parse_base_url("https://api.example.com/v1/", "TEST_URL").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/");
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        let result = parse_base_url("ftp://api.example.com", "TEST_URL");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_remote_config_debug_redacts_token() {
        let config = RemoteConfig {
            base_url: Url::parse("https://api.example.com/").unwrap(),
            token: SecretString::from("super_secret_remote_token"),
            timeout: Duration::from_secs(10),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("api.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_remote_token"));
    }

    #[test]
    fn test_bearer_header() {
        let config = RemoteConfig {
            base_url: Url::parse("https://api.example.com/").unwrap(),
            token: SecretString::from("tok"),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(config.bearer(), "Bearer tok");
    }

    #[test]
    fn test_defaults() {
        let local = LocalConfig::default();
        assert_eq!(local.capacity, 100);
        assert_eq!(local.dir, PathBuf::from(".carryover"));

        let catalog = CatalogConfig::default();
        assert_eq!(catalog.capacity, 1000);
        assert_eq!(catalog.ttl, Duration::from_secs(300));
    }
}

//! Connector configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SIGNIFYD_API_KEY` - Signifyd team API key
//!
//! ## Optional
//! - `SIGNIFYD_API_URL` - API base URL (default: <https://api.signifyd.com/v2>)
//! - `SIGNIFYD_HTTP_TIMEOUT_SECS` - Request timeout for case submission (default: 30)
//! - `SIGNIFYD_DEVICE_FINGERPRINT` - Enable device fingerprinting (default: false)
//! - `STORE_BASE_URL` - Storefront base URL, required when fingerprinting is enabled
//! - `STORE_PLATFORM` - Platform name reported with cases (default: Magento 2)
//! - `STORE_PLATFORM_VERSION` - Platform version reported with cases (default: unknown)
//! - `SIGNIFYD_DATABASE_URL` - `PostgreSQL` connection string for case records
//!   (falls back to `DATABASE_URL`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use signifyd_connect_core::VersionInfo;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_API_URL: &str = "https://api.signifyd.com/v2";
const DEFAULT_PLATFORM: &str = "Magento 2";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

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

/// Connector configuration.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Signifyd API configuration
    pub api: ApiConfig,
    /// Device fingerprint configuration
    pub fingerprint: FingerprintConfig,
    /// Platform name reported in `clientVersion`
    pub platform: String,
    /// Platform version reported in `clientVersion`
    pub platform_version: String,
    /// `PostgreSQL` URL for the case table (optional)
    pub database_url: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
}

/// Signifyd API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL, without trailing slash
    pub base_url: Url,
    /// Team API key
    pub api_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Device fingerprint configuration.
#[derive(Debug, Clone, Default)]
pub struct FingerprintConfig {
    pub enabled: bool,
    /// Storefront base URL embedded in generated fingerprints
    pub store_url: Option<String>,
}

impl ConnectConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let fingerprint = FingerprintConfig::from_env()?;
        let platform = get_env_or_default("STORE_PLATFORM", DEFAULT_PLATFORM);
        let platform_version = get_env_or_default("STORE_PLATFORM_VERSION", "unknown");
        let database_url = get_database_url("SIGNIFYD_DATABASE_URL");
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            api,
            fingerprint,
            platform,
            platform_version,
            database_url,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Version block sent as `clientVersion` with every case.
    #[must_use]
    pub fn version_info(&self) -> VersionInfo {
        VersionInfo {
            store_platform: self.platform.clone(),
            store_platform_version: self.platform_version.clone(),
            signifyd_client_app: self.platform.clone(),
            signifyd_client_app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_env_or_default("SIGNIFYD_API_URL", DEFAULT_API_URL);
        let base_url = parse_base_url(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("SIGNIFYD_API_URL".to_string(), e))?;
        let timeout = get_optional_env("SIGNIFYD_HTTP_TIMEOUT_SECS")
            .map_or(Ok(DEFAULT_TIMEOUT_SECS), |v| parse_timeout_secs(&v))
            .map_err(|e| ConfigError::InvalidEnvVar("SIGNIFYD_HTTP_TIMEOUT_SECS".to_string(), e))?;

        Ok(Self {
            base_url,
            api_key: get_validated_secret("SIGNIFYD_API_KEY")?,
            timeout: Duration::from_secs(timeout),
        })
    }
}

impl FingerprintConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let enabled = parse_bool(&get_env_or_default("SIGNIFYD_DEVICE_FINGERPRINT", "false"))
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "SIGNIFYD_DEVICE_FINGERPRINT".to_string(),
                    "expected true/false".to_string(),
                )
            })?;
        let store_url = get_optional_env("STORE_BASE_URL");

        if enabled && store_url.is_none() {
            return Err(ConfigError::MissingEnvVar("STORE_BASE_URL".to_string()));
        }

        Ok(Self { enabled, store_url })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Parse a request timeout in whole seconds. Zero is rejected.
fn parse_timeout_secs(value: &str) -> Result<u64, String> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err("timeout must be at least 1 second".to_string()),
        Ok(secs) => Ok(secs),
        Err(e) => Err(format!("expected whole seconds: {e}")),
    }
}

/// Parse the API base URL, dropping any trailing slash.
fn parse_base_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value.trim_end_matches('/')).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}'")),
    }
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

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
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

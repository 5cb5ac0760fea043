//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SQLAGENT_AUTH_DATABASE_URL` - MySQL connection string for the `admins` table
//! - `ANTHROPIC_API_KEY` - Anthropic API key used by the agent's LLM service
//!
//! ## Optional
//! - `SQLAGENT_HOST` - Bind address (default: 127.0.0.1)
//! - `SQLAGENT_PORT` - Listen port (default: 8000)
//! - `SQLAGENT_SQL_DATABASE_URL` - MySQL database the agent queries (default: the auth database)
//! - `SQLAGENT_LLM_MODEL` - Model ID (default: claude-sonnet-4-20250514)
//! - `SQLAGENT_SESSION_COOKIE_NAME` - Session cookie name (default: `sqlagent_email`)
//! - `SQLAGENT_SESSION_COOKIE_SECURE` - Set the `Secure` attribute (default: true when TLS is configured)
//! - `SQLAGENT_SESSION_COOKIE_SAME_SITE` - `lax`, `strict` or `none` (default: lax)
//! - `SQLAGENT_CORS_ORIGINS` - Comma separated list of allowed browser origins
//! - `SQLAGENT_MEMORY_DIR` - Directory holding the agent memory database (default: working directory)
//! - `SQLAGENT_MEMORY_COLLECTION` - Memory collection name (default: `tool_memories`)
//! - `SQLAGENT_INDEX_FILE` - File served at `/index` (default: static/index.html)
//! - `SQLAGENT_STREAM_RESPONSES` - Stream chat replies as SSE (default: true)
//! - `SQLAGENT_AUTO_SAVE_CONVERSATIONS` - Persist chat exchanges to memory (default: true)
//! - `SQLAGENT_LOG_JSON` - Emit JSON logs (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `SQLAGENT_TLS_CERT` - PEM-encoded certificate chain
//! - `SQLAGENT_TLS_KEY` - PEM-encoded private key
//!
//! Secrets have no defaults: a missing database URL or API key is a startup error.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use cookie::SameSite;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::agent::AgentConfig;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_COOKIE_NAME: &str = "sqlagent_email";
const DEFAULT_MEMORY_COLLECTION: &str = "tool_memories";
const DEFAULT_INDEX_FILE: &str = "static/index.html";

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

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// MySQL URL of the credential store (contains password)
    pub auth_database_url: SecretString,
    /// MySQL URL of the database the agent queries (contains password)
    pub sql_database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Session cookie attributes
    pub cookie: CookieConfig,
    /// Browser origins allowed to call the API with credentials
    pub cors_origins: Vec<String>,
    /// LLM backend configuration
    pub llm: LlmConfig,
    /// Agent memory store location
    pub memory: MemoryConfig,
    /// Static agent behaviour
    pub agent: AgentConfig,
    /// File served at `/index`
    pub index_file: PathBuf,
    /// Emit JSON formatted logs
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Session cookie attributes.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Cookie name carrying the session email.
    pub name: String,
    /// Whether to set the `Secure` attribute.
    pub secure: bool,
    /// `SameSite` policy.
    pub same_site: SameSite,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_owned(),
            secure: false,
            same_site: SameSite::Lax,
        }
    }
}

/// LLM API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct LlmConfig {
    /// Anthropic API key
    pub api_key: SecretString,
    /// Model ID (e.g., claude-sonnet-4-20250514)
    pub model: String,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// Agent memory store location.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Directory holding the memory database file.
    pub persist_dir: PathBuf,
    /// Collection the memories are stored under.
    pub collection: String,
}

impl MemoryConfig {
    /// Load the memory store location from environment.
    ///
    /// Shared with the CLI, which seeds the same store.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the working directory cannot be
    /// determined and no directory was configured.
    pub fn from_env() -> Result<Self, ConfigError> {
        let persist_dir = match get_optional_env("SQLAGENT_MEMORY_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().map_err(|e| {
                ConfigError::InvalidEnvVar("SQLAGENT_MEMORY_DIR".to_string(), e.to_string())
            })?,
        };
        let collection =
            get_env_or_default("SQLAGENT_MEMORY_COLLECTION", DEFAULT_MEMORY_COLLECTION);
        if collection.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "SQLAGENT_MEMORY_COLLECTION".to_string(),
                "must not be empty".to_string(),
            ));
        }

        Ok(Self {
            persist_dir,
            collection,
        })
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = get_optional_env("SQLAGENT_TLS_CERT");
        let key_pem = get_optional_env("SQLAGENT_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SQLAGENT_TLS_*".to_string(),
                "Both SQLAGENT_TLS_CERT and SQLAGENT_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let auth_database_url = get_mysql_url("SQLAGENT_AUTH_DATABASE_URL")?;
        let sql_database_url = match get_optional_env("SQLAGENT_SQL_DATABASE_URL") {
            Some(_) => get_mysql_url("SQLAGENT_SQL_DATABASE_URL")?,
            None => auth_database_url.clone(),
        };
        let host = get_env_or_default("SQLAGENT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SQLAGENT_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SQLAGENT_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SQLAGENT_PORT".to_string(), e.to_string()))?;

        let tls = TlsConfig::from_env()?;
        let cookie = CookieConfig::from_env(tls.is_some())?;
        let cors_origins = get_optional_env("SQLAGENT_CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .transpose()?
            .unwrap_or_default();

        let llm = LlmConfig::from_env()?;
        let memory = MemoryConfig::from_env()?;
        let agent = AgentConfig {
            stream_responses: get_bool_env("SQLAGENT_STREAM_RESPONSES", true)?,
            auto_save_conversations: get_bool_env("SQLAGENT_AUTO_SAVE_CONVERSATIONS", true)?,
        };
        let index_file = PathBuf::from(get_env_or_default("SQLAGENT_INDEX_FILE", DEFAULT_INDEX_FILE));
        let log_json = get_bool_env("SQLAGENT_LOG_JSON", false)?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            auth_database_url,
            sql_database_url,
            host,
            port,
            cookie,
            cors_origins,
            llm,
            memory,
            agent,
            index_file,
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CookieConfig {
    fn from_env(tls_enabled: bool) -> Result<Self, ConfigError> {
        let name = get_env_or_default("SQLAGENT_SESSION_COOKIE_NAME", DEFAULT_COOKIE_NAME);
        if !is_valid_cookie_name(&name) {
            return Err(ConfigError::InvalidEnvVar(
                "SQLAGENT_SESSION_COOKIE_NAME".to_string(),
                format!("'{name}' is not a valid cookie name"),
            ));
        }

        let secure = get_bool_env("SQLAGENT_SESSION_COOKIE_SECURE", tls_enabled)?;
        let same_site = parse_same_site(&get_env_or_default(
            "SQLAGENT_SESSION_COOKIE_SAME_SITE",
            "lax",
        ))?;

        if same_site == SameSite::None && !secure {
            tracing::warn!(
                "SameSite=None without the Secure attribute is rejected by most browsers; \
                 set SQLAGENT_SESSION_COOKIE_SECURE=true behind HTTPS"
            );
        }

        Ok(Self {
            name,
            secure,
            same_site,
        })
    }
}

impl LlmConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_validated_secret("ANTHROPIC_API_KEY")?,
            model: get_env_or_default("SQLAGENT_LLM_MODEL", DEFAULT_LLM_MODEL),
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

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a boolean environment variable with a default value.
fn get_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        parse_bool(&raw).ok_or_else(|| {
            ConfigError::InvalidEnvVar(key.to_string(), format!("expected a boolean, got '{raw}'"))
        })
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get a required MySQL connection URL as a secret.
fn get_mysql_url(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    let url = Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.scheme() != "mysql" {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a mysql:// URL, got scheme '{}'", url.scheme()),
        ));
    }
    Ok(SecretString::from(value))
}

/// Parse a `SameSite` policy name.
fn parse_same_site(raw: &str) -> Result<SameSite, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "lax" => Ok(SameSite::Lax),
        "strict" => Ok(SameSite::Strict),
        "none" => Ok(SameSite::None),
        other => Err(ConfigError::InvalidEnvVar(
            "SQLAGENT_SESSION_COOKIE_SAME_SITE".to_string(),
            format!("expected lax, strict or none, got '{other}'"),
        )),
    }
}

/// RFC 6265 cookie names are HTTP tokens.
fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

/// Parse a comma separated list of browser origins (`scheme://host[:port]`).
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            let url = Url::parse(origin).map_err(|e| {
                ConfigError::InvalidEnvVar("SQLAGENT_CORS_ORIGINS".to_string(), format!("{origin}: {e}"))
            })?;
            if url.host_str().is_none() {
                return Err(ConfigError::InvalidEnvVar(
                    "SQLAGENT_CORS_ORIGINS".to_string(),
                    format!("{origin}: origin must have a host"),
                ));
            }
            Ok(url.origin().ascii_serialization())
        })
        .collect()
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
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

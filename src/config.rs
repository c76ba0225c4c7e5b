use std::env;

use crate::auth::CookieSettings;

const MIN_SECRET_LENGTH: usize = 16;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Bind address (0.0.0.0 for LAN, 127.0.0.1 for localhost)
    pub bind_addr: String,
    /// PostgreSQL database URL; only optional for in-memory runs
    pub database_url: Option<String>,
    /// Key for signing session cookies
    pub session_secret: String,
    /// Inactivity window in seconds; every request on a session restarts it
    pub session_timeout_seconds: u64,
    pub session_cookie_name: String,
    /// Set the Secure attribute on the session cookie
    pub cookie_secure: bool,
    /// How often expired sessions are swept from the store
    pub session_cleanup_interval_seconds: u64,
    /// CORS allowed origins (comma-separated in env var)
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let session_secret = lookup("SESSION_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("SESSION_SECRET".to_string()))?;

        if session_secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "SESSION_SECRET must be at least {} characters",
                MIN_SECRET_LENGTH
            )));
        }

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort)?,
            None => 5000,
        };

        Ok(Self {
            port,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            session_secret,
            session_timeout_seconds: parse_or("SESSION_TIMEOUT_SECONDS", &lookup, 3600)?,
            session_cookie_name: lookup("SESSION_COOKIE_NAME").unwrap_or_else(|| "sid".to_string()),
            cookie_secure: lookup("COOKIE_SECURE")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            session_cleanup_interval_seconds: parse_or(
                "SESSION_CLEANUP_INTERVAL_SECONDS",
                &lookup,
                300,
            )?,
            cors_origins: match lookup("CORS_ORIGINS") {
                Some(raw) => parse_cors_origins(&raw)?,
                None => vec!["http://localhost:3000".to_string()],
            },
        })
    }

    /// The database URL, which every Postgres-backed command needs
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }

    /// Get the full bind address (addr:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            name: self.session_cookie_name.clone(),
            secure: self.cookie_secure,
            max_age_seconds: self.session_timeout_seconds,
        }
    }
}

fn parse_or<F>(key: &str, lookup: &F, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{} must be a whole number", key))),
        None => Ok(default),
    }
}

/// Comma-separated explicit origins. Credentialed CORS cannot use a
/// wildcard, so `*` is refused here rather than at router construction.
fn parse_cors_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if origins.iter().any(|origin| origin == "*") {
        return Err(ConfigError::InvalidValue(
            "CORS_ORIGINS must list explicit origins; '*' is not allowed with credentials"
                .to_string(),
        ));
    }
    Ok(origins)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

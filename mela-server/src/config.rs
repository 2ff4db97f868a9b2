//! Server configuration

use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration, loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP port (API + WebSocket)
    pub http_port: u16,
    /// PostgreSQL connection URL. `None` selects the in-memory store
    /// (development only).
    pub database_url: Option<String>,
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,
    /// Expected `iss` claim
    pub jwt_issuer: String,
    /// Upper bound for a single live push delivery
    pub push_timeout: Duration,
    /// Outbound push queue capacity
    pub push_queue_capacity: usize,
    /// Per-connection outbound buffer
    pub connection_buffer: usize,
    /// Concurrent live connections allowed per user
    pub max_connections_per_user: usize,
    /// Daily-rolling log directory (optional)
    pub log_dir: Option<String>,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn flag(value: &str) -> bool {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if database_url.is_none() && environment != "development" {
            return Err(format!("DATABASE_URL must be set in {environment} environment").into());
        }

        Ok(Self {
            http_port: Self::parse_or("HTTP_PORT", 8080),
            database_url,
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "mela".into()),
            push_timeout: Duration::from_millis(Self::parse_or("PUSH_TIMEOUT_MS", 2000)),
            push_queue_capacity: Self::parse_or("PUSH_QUEUE_CAPACITY", 1024).max(1),
            connection_buffer: Self::parse_or("CONNECTION_BUFFER", 64).max(1),
            max_connections_per_user: Self::parse_or("MAX_CONNECTIONS_PER_USER", 10),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            log_json: std::env::var("LOG_JSON").is_ok_and(|v| Self::flag(&v)),
            environment,
        })
    }

    /// Defaults for tests and local tooling: in-memory store, fixed secret
    pub fn development() -> Self {
        Self {
            environment: "development".into(),
            http_port: 8080,
            database_url: None,
            jwt_secret: "dev-JWT_SECRET-not-for-production".into(),
            jwt_issuer: "mela".into(),
            push_timeout: Duration::from_millis(2000),
            push_queue_capacity: 1024,
            connection_buffer: 64,
            max_connections_per_user: 10,
            log_dir: None,
            log_json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_json_flag_values() {
        for on in ["1", "true", "TRUE", " yes ", "on"] {
            assert!(Config::flag(on), "{on}");
        }
        for off in ["", "0", "false", "no", "json"] {
            assert!(!Config::flag(off), "{off}");
        }
        assert!(!Config::development().log_json);
    }
}

//! Engine configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: String,

    /// Maximum pooled SQLite connections
    pub db_max_connections: u32,

    /// Redis connection string. Without it sessions live in process memory.
    pub redis_url: Option<String>,

    /// Secret key for signing bearer credentials
    pub jwt_secret: String,

    /// Session lifetime in seconds
    pub session_ttl_secs: u64,

    /// Bearer credential lifetime in seconds
    pub bearer_lifetime_secs: i64,

    /// Upper bound for one store call or transaction attempt, in milliseconds
    pub store_timeout_ms: u64,

    /// Upper bound for one session store call, in milliseconds
    pub session_timeout_ms: u64,

    /// How many times a conflicting transaction is attempted before giving up
    pub tx_max_attempts: u32,

    /// Argon2 memory cost in KiB
    pub password_memory_kib: u32,

    /// Argon2 iteration count
    pub password_iterations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: "./vending.db".to_string(),
            db_max_connections: 5,
            redis_url: None,
            jwt_secret: "vending-dev-secret-change-in-production".to_string(),
            session_ttl_secs: 7200,
            bearer_lifetime_secs: 7200,
            store_timeout_ms: 5000,
            session_timeout_ms: 2000,
            tx_max_attempts: 5,
            password_memory_kib: 19 * 1024,
            password_iterations: 2,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. `load` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),

            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,

            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),

            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),

            session_ttl_secs: parse_or(&lookup, "SESSION_TTL_SECS", defaults.session_ttl_secs)?,

            bearer_lifetime_secs: parse_or(
                &lookup,
                "BEARER_LIFETIME_SECS",
                defaults.bearer_lifetime_secs,
            )?,

            store_timeout_ms: parse_or(&lookup, "STORE_TIMEOUT_MS", defaults.store_timeout_ms)?,

            session_timeout_ms: parse_or(&lookup, "SESSION_TIMEOUT_MS", defaults.session_timeout_ms)?,

            tx_max_attempts: parse_or(&lookup, "TX_MAX_ATTEMPTS", defaults.tx_max_attempts)?,

            password_memory_kib: parse_or(
                &lookup,
                "PASSWORD_MEMORY_KIB",
                defaults.password_memory_kib,
            )?,

            password_iterations: parse_or(
                &lookup,
                "PASSWORD_ITERATIONS",
                defaults.password_iterations,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make the engine unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if self.session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue("SESSION_TTL_SECS".to_string()));
        }
        if self.bearer_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("BEARER_LIFETIME_SECS".to_string()));
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("STORE_TIMEOUT_MS".to_string()));
        }
        if self.session_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("SESSION_TIMEOUT_MS".to_string()));
        }
        if self.tx_max_attempts == 0 {
            return Err(ConfigError::InvalidValue("TX_MAX_ATTEMPTS".to_string()));
        }
        // argon2 requires at least 8 KiB per lane
        if self.password_memory_kib < 8 {
            return Err(ConfigError::InvalidValue("PASSWORD_MEMORY_KIB".to_string()));
        }
        if self.password_iterations == 0 {
            return Err(ConfigError::InvalidValue("PASSWORD_ITERATIONS".to_string()));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.session_ttl_secs, 7200);
        assert_eq!(config.bearer_lifetime_secs, 7200);
        assert_eq!(config.tx_max_attempts, 5);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("DATABASE_PATH", "/tmp/v.db"),
            ("REDIS_URL", "redis://cache:6379"),
            ("TX_MAX_ATTEMPTS", "9"),
            ("STORE_TIMEOUT_MS", " 250 "),
        ]))
        .unwrap();

        assert_eq!(config.database_path, "/tmp/v.db");
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.tx_max_attempts, 9);
        assert_eq!(config.store_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_values() {
        let err = EngineConfig::from_lookup(lookup_from(&[("SESSION_TTL_SECS", "soon")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for SESSION_TTL_SECS");

        assert!(EngineConfig::from_lookup(lookup_from(&[("TX_MAX_ATTEMPTS", "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup_from(&[("JWT_SECRET", " ")])).is_err());
    }

    #[test]
    fn test_blank_redis_url_is_none() {
        let config = EngineConfig::from_lookup(lookup_from(&[("REDIS_URL", "")])).unwrap();
        assert!(config.redis_url.is_none());
    }
}

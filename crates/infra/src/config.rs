//! Configuration loading and representation.
//!
//! Everything comes from environment variables with development defaults.
//! Binaries load an optional `.env` file before calling [`AppConfig::from_env`].

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Postgres connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Full URL; takes precedence over the individual parts when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub sslmode: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}?sslmode={}",
                self.user, self.password, self.host, self.port, self.name, self.sslmode
            ),
        }
    }
}

/// Redis settings for the liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
}

impl RedisConfig {
    pub fn url(&self) -> String {
        match &self.password {
            Some(pw) => format!("redis://:{pw}@{}:{}/{}", self.host, self.port, self.db),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub use_persistent_stores: bool,
    pub seed_defaults: bool,
    pub database: DatabaseConfig,
    /// `None` unless `REDIS_HOST` is set.
    pub redis: Option<RedisConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            host: get("DB_HOST", "localhost"),
            port: parse_var("DB_PORT", lookup("DB_PORT"), 5432)?,
            user: get("DB_USER", "admin"),
            password: get("DB_PASSWORD", "password"),
            name: get("DB_NAME", "authorizationdb"),
            sslmode: get("DB_SSLMODE", "disable"),
            max_connections: parse_var("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), 10)?,
        };

        let redis = match lookup("REDIS_HOST").filter(|s| !s.trim().is_empty()) {
            Some(host) => Some(RedisConfig {
                host,
                port: parse_var("REDIS_PORT", lookup("REDIS_PORT"), 6379)?,
                password: lookup("REDIS_PASSWORD").filter(|s| !s.is_empty()),
                db: parse_var("REDIS_DB", lookup("REDIS_DB"), 0)?,
            }),
            None => None,
        };

        Ok(Self {
            port: parse_var("PORT", lookup("PORT"), 8080)?,
            use_persistent_stores: parse_flag("USE_PERSISTENT_STORES", lookup("USE_PERSISTENT_STORES"))?,
            seed_defaults: parse_flag("SEED_DEFAULTS", lookup("SEED_DEFAULTS"))?,
            database,
            redis,
        })
    }
}

fn parse_var<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_flag(var: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            var,
            value: v.to_string(),
            reason: "expected true/false".to_string(),
        }),
    }
}

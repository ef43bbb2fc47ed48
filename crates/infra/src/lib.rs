//! Infrastructure layer: config, Postgres, Redis, health checks.

pub mod config;
pub mod db;
pub mod health;
pub mod store;

#[cfg(feature = "redis")]
pub mod liveness;


pub use config::{AppConfig, ConfigError, DatabaseConfig, RedisConfig};
pub use db::{connect_pool, migrate, MigrationError};
pub use health::{HealthCheck, HealthError};
pub use store::{InMemoryEntityStore, PostgresEntityStore};

#[cfg(feature = "redis")]
pub use liveness::RedisLiveness;

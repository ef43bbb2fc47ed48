//! Redis liveness probe (optional).
//!
//! Redis holds no authorization state. The probe writes a short-lived marker
//! key and pings the server; nothing else touches Redis.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::info;

use crate::config::RedisConfig;
use crate::health::{HealthCheck, HealthError};

const COMPONENT: &str = "redis";
const MARKER_KEY: &str = "health_check";
const MARKER_TTL_SECS: u64 = 60;

/// Explicitly constructed Redis client: connect at startup, pass it to
/// whoever needs it, `close` at shutdown.
#[derive(Clone)]
pub struct RedisLiveness {
    conn: MultiplexedConnection,
}

impl std::fmt::Debug for RedisLiveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLiveness").finish_non_exhaustive()
    }
}

impl RedisLiveness {
    pub async fn connect(config: &RedisConfig) -> Result<Self, HealthError> {
        let client = redis::Client::open(config.url()).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        info!(host = %config.host, port = config.port, db = config.db, "redis liveness connected");
        Ok(Self { conn })
    }

    /// Drops the connection. Clones held elsewhere keep theirs until dropped.
    pub fn close(self) {
        drop(self.conn);
        info!("redis liveness connection closed");
    }
}

#[async_trait]
impl HealthCheck for RedisLiveness {
    fn component(&self) -> &'static str {
        COMPONENT
    }

    async fn check(&self) -> Result<(), HealthError> {
        let mut conn = self.conn.clone();

        redis::cmd("SET")
            .arg(MARKER_KEY)
            .arg("ok")
            .arg("EX")
            .arg(MARKER_TTL_SECS)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        if pong != "PONG" {
            return Err(HealthError::Unavailable {
                component: COMPONENT,
                reason: format!("unexpected PING reply '{pong}'"),
            });
        }
        Ok(())
    }
}

fn unavailable(err: redis::RedisError) -> HealthError {
    HealthError::Unavailable {
        component: COMPONENT,
        reason: err.to_string(),
    }
}

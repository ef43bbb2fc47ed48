//! Service wiring: picks the store backend and bundles the health probes.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use gatekeep_auth::{seed_defaults, AuthzServices, EntityStore};
use gatekeep_core::{Clock, SystemClock};
use gatekeep_infra::{
    connect_pool, migrate, AppConfig, HealthCheck, InMemoryEntityStore, PostgresEntityStore,
    RedisLiveness,
};

pub type SharedStore = Arc<dyn EntityStore>;

pub struct AppServices {
    pub authz: AuthzServices<SharedStore>,
    /// Probe for whichever store backs `authz`.
    pub store_health: Arc<dyn HealthCheck>,
    /// Redis probe; `None` when Redis is not configured.
    pub liveness: Option<Arc<dyn HealthCheck>>,
}

impl AppServices {
    /// Fresh in-memory backend (dev/tests).
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryEntityStore::new());
        Self::from_store(store.clone(), store)
    }

    fn from_store(store: SharedStore, store_health: Arc<dyn HealthCheck>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            authz: AuthzServices::new(store, clock),
            store_health,
            liveness: None,
        }
    }

    pub fn with_liveness(mut self, probe: Arc<dyn HealthCheck>) -> Self {
        self.liveness = Some(probe);
        self
    }
}

/// Build services from config: Postgres when `USE_PERSISTENT_STORES=true`
/// (migrating on start), otherwise in-memory. Seeds defaults when asked.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let services = if config.use_persistent_stores {
        let pool = connect_pool(&config.database)
            .await
            .context("failed to connect to Postgres")?;
        migrate(&pool).await.context("failed to migrate schema")?;

        let store = Arc::new(PostgresEntityStore::new(pool));
        info!(backend = "postgres", "entity store ready");
        AppServices::from_store(store.clone(), store)
    } else {
        info!(backend = "in-memory", "entity store ready");
        AppServices::in_memory()
    };

    if config.seed_defaults {
        let report = seed_defaults(&services.authz)
            .await
            .context("failed to seed default data")?;
        info!(
            permissions = ?report.permissions_created,
            roles = ?report.roles_created,
            "seeding finished"
        );
    }

    Ok(services)
}

/// Connect the Redis probe if configured. Failure is logged, not fatal: Redis
/// carries no authorization state.
pub async fn connect_liveness(config: &AppConfig) -> Option<RedisLiveness> {
    let redis = config.redis.as_ref()?;
    match RedisLiveness::connect(redis).await {
        Ok(probe) => Some(probe),
        Err(e) => {
            warn!(error = %e, "redis liveness probe disabled");
            None
        }
    }
}

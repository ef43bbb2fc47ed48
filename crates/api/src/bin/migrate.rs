//! Apply the Postgres schema and, with `SEED_DEFAULTS=true`, the default data.

use std::sync::Arc;

use anyhow::Context;

use gatekeep_auth::{seed_defaults, AuthzServices};
use gatekeep_core::SystemClock;
use gatekeep_infra::{connect_pool, migrate, AppConfig, PostgresEntityStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    gatekeep_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let pool = connect_pool(&config.database)
        .await
        .context("failed to connect to Postgres")?;

    migrate(&pool).await?;

    if config.seed_defaults {
        let services = AuthzServices::new(Arc::new(PostgresEntityStore::new(pool)), Arc::new(SystemClock));
        let report = seed_defaults(&services).await?;
        tracing::info!(
            permissions = ?report.permissions_created,
            roles = ?report.roles_created,
            "seeding finished"
        );
    }
    Ok(())
}

//! Postgres connection pool and schema migration.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration step {step} failed: {source}")]
    Statement {
        step: usize,
        #[source]
        source: sqlx::Error,
    },
}

/// Idempotent schema, applied in order.
///
/// Deleting a role or permission cascades to its bindings; deleting a
/// permission also cascades to its bans.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id   BIGSERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS permissions (
        id   BIGSERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS role_permissions (
        role_id       BIGINT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        permission_id BIGINT NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
        PRIMARY KEY (role_id, permission_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_role_permissions_permission
        ON role_permissions (permission_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_bans (
        id            BIGSERIAL PRIMARY KEY,
        user_id       VARCHAR(255) NOT NULL,
        permission_id BIGINT NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
        reason        VARCHAR(500) NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (user_id, permission_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_user_bans_created_at
        ON user_bans (created_at)
    "#,
];

pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.connection_url())
        .await
}

/// Apply the schema. Safe to run on every start.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrationError> {
    for (step, ddl) in SCHEMA.iter().enumerate() {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|source| MigrationError::Statement { step, source })?;
    }
    info!(steps = SCHEMA.len(), "schema migrated");
    Ok(())
}

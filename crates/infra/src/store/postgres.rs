//! Postgres-backed entity store.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `NotFound` |
//! | Database (other) | any other | `Unavailable` |
//! | PoolClosed, Io, Tls, ... | n/a | `Unavailable` |
//!
//! Absence is detected with `fetch_optional` / `rows_affected`, never through
//! `RowNotFound`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use gatekeep_auth::store::{BanStore, BindingStore, PermissionStore, RoleStore, StoreError, StoreResult};
use gatekeep_auth::{
    BanReason, Binding, NewBan, Permission, PermissionName, PermissionWithRoles, Role, RoleName,
    RoleWithPermissions, UserBan, UserRef,
};
use gatekeep_core::{BanId, PermissionId, RoleId, ValueObject};

const BAN_COLUMNS: &str = "id, user_id, permission_id, reason, created_at, updated_at";

/// Postgres-backed entity store.
///
/// Uniqueness and referential integrity are enforced by the schema
/// constraints; multi-statement operations run in one transaction.
#[derive(Debug, Clone)]
pub struct PostgresEntityStore {
    pool: Arc<PgPool>,
}

impl PostgresEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Round-trip to the database.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }

    async fn begin(&self, operation: &str) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

async fn commit(tx: Transaction<'static, Postgres>, operation: &str) -> StoreResult<()> {
    tx.commit().await.map_err(|e| map_sqlx_error(operation, e))
}

#[async_trait]
impl RoleStore for PostgresEntityStore {
    #[instrument(skip(self), fields(name = %name), err)]
    async fn insert_role(&self, name: &RoleName) -> StoreResult<Role> {
        let row = sqlx::query("INSERT INTO roles (name) VALUES ($1) RETURNING id, name")
            .bind(name.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("role '{name}' already exists"))
                } else {
                    map_sqlx_error("insert_role", e)
                }
            })?;
        decode::<RoleRow>(&row).map(Into::into)
    }

    #[instrument(skip(self), fields(role_id = %id))]
    async fn role_by_id(&self, id: RoleId) -> StoreResult<Role> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("role_by_id", e))?
            .ok_or_else(|| StoreError::NotFound(format!("role {id}")))?;
        decode::<RoleRow>(&row).map(Into::into)
    }

    #[instrument(skip(self))]
    async fn role_by_name(&self, name: &str) -> StoreResult<Role> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("role_by_name", e))?
            .ok_or_else(|| StoreError::NotFound(format!("role '{name}'")))?;
        decode::<RoleRow>(&row).map(Into::into)
    }

    #[instrument(skip(self))]
    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query("SELECT id, name FROM roles ORDER BY id ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;
        decode_all::<RoleRow, Role>(&rows)
    }

    #[instrument(skip(self), fields(role_id = %id, name = %name), err)]
    async fn rename_role(&self, id: RoleId, name: &RoleName) -> StoreResult<Role> {
        let row = sqlx::query("UPDATE roles SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id.get())
            .bind(name.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("role '{name}' already exists"))
                } else {
                    map_sqlx_error("rename_role", e)
                }
            })?
            .ok_or_else(|| StoreError::NotFound(format!("role {id}")))?;
        decode::<RoleRow>(&row).map(Into::into)
    }

    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn delete_role(&self, id: RoleId) -> StoreResult<()> {
        let mut tx = self.begin("delete_role").await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;

        let deleted = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?
            .rows_affected();

        if deleted == 0 {
            // Dropping the transaction rolls it back.
            return Err(StoreError::NotFound(format!("role {id}")));
        }
        commit(tx, "delete_role").await
    }

    #[instrument(skip(self), fields(role_id = %id))]
    async fn role_with_permissions(&self, id: RoleId) -> StoreResult<RoleWithPermissions> {
        let mut tx = self.begin("role_with_permissions").await?;

        let row = sqlx::query("SELECT id, name FROM roles WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("role_with_permissions", e))?
            .ok_or_else(|| StoreError::NotFound(format!("role {id}")))?;
        let role: Role = decode::<RoleRow>(&row)?.into();

        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.id ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("role_with_permissions", e))?;
        let permissions = decode_all::<PermissionRow, Permission>(&rows)?;

        commit(tx, "role_with_permissions").await?;
        Ok(RoleWithPermissions { role, permissions })
    }
}

#[async_trait]
impl PermissionStore for PostgresEntityStore {
    #[instrument(skip(self), fields(name = %name), err)]
    async fn insert_permission(&self, name: &PermissionName) -> StoreResult<Permission> {
        let row = sqlx::query("INSERT INTO permissions (name) VALUES ($1) RETURNING id, name")
            .bind(name.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("permission '{name}' already exists"))
                } else {
                    map_sqlx_error("insert_permission", e)
                }
            })?;
        decode::<PermissionRow>(&row).map(Into::into)
    }

    #[instrument(skip(self), fields(permission_id = %id))]
    async fn permission_by_id(&self, id: PermissionId) -> StoreResult<Permission> {
        let row = sqlx::query("SELECT id, name FROM permissions WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("permission_by_id", e))?
            .ok_or_else(|| StoreError::NotFound(format!("permission {id}")))?;
        decode::<PermissionRow>(&row).map(Into::into)
    }

    #[instrument(skip(self))]
    async fn permission_by_name(&self, name: &str) -> StoreResult<Permission> {
        let row = sqlx::query("SELECT id, name FROM permissions WHERE name = $1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("permission_by_name", e))?
            .ok_or_else(|| StoreError::NotFound(format!("permission '{name}'")))?;
        decode::<PermissionRow>(&row).map(Into::into)
    }

    #[instrument(skip(self))]
    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        let rows = sqlx::query("SELECT id, name FROM permissions ORDER BY id ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_permissions", e))?;
        decode_all::<PermissionRow, Permission>(&rows)
    }

    #[instrument(skip(self), fields(permission_id = %id, name = %name), err)]
    async fn rename_permission(
        &self,
        id: PermissionId,
        name: &PermissionName,
    ) -> StoreResult<Permission> {
        let row = sqlx::query("UPDATE permissions SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id.get())
            .bind(name.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("permission '{name}' already exists"))
                } else {
                    map_sqlx_error("rename_permission", e)
                }
            })?
            .ok_or_else(|| StoreError::NotFound(format!("permission {id}")))?;
        decode::<PermissionRow>(&row).map(Into::into)
    }

    #[instrument(skip(self), fields(permission_id = %id), err)]
    async fn delete_permission(&self, id: PermissionId) -> StoreResult<()> {
        let mut tx = self.begin("delete_permission").await?;

        for sql in [
            "DELETE FROM user_bans WHERE permission_id = $1",
            "DELETE FROM role_permissions WHERE permission_id = $1",
        ] {
            sqlx::query(sql)
                .bind(id.get())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_permission", e))?;
        }

        let deleted = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_permission", e))?
            .rows_affected();

        if deleted == 0 {
            return Err(StoreError::NotFound(format!("permission {id}")));
        }
        commit(tx, "delete_permission").await
    }

    #[instrument(skip(self), fields(permission_id = %id))]
    async fn permission_with_roles(&self, id: PermissionId) -> StoreResult<PermissionWithRoles> {
        let mut tx = self.begin("permission_with_roles").await?;

        let row = sqlx::query("SELECT id, name FROM permissions WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("permission_with_roles", e))?
            .ok_or_else(|| StoreError::NotFound(format!("permission {id}")))?;
        let permission: Permission = decode::<PermissionRow>(&row)?.into();

        let rows = sqlx::query(
            r#"
            SELECT r.id, r.name
            FROM roles r
            JOIN role_permissions rp ON rp.role_id = r.id
            WHERE rp.permission_id = $1
            ORDER BY r.id ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("permission_with_roles", e))?;
        let roles = decode_all::<RoleRow, Role>(&rows)?;

        commit(tx, "permission_with_roles").await?;
        Ok(PermissionWithRoles { permission, roles })
    }
}

#[async_trait]
impl BindingStore for PostgresEntityStore {
    #[instrument(skip(self), fields(role_id = %role_id, permission_id = %permission_id), err)]
    async fn insert_binding(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<Binding> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission_id) DO NOTHING
            "#,
        )
        .bind(role_id.get())
        .bind(permission_id.get())
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::NotFound(format!("role {role_id} or permission {permission_id}"))
            } else {
                map_sqlx_error("insert_binding", e)
            }
        })?
        .rows_affected();

        if inserted == 0 {
            return Err(StoreError::Conflict(format!(
                "permission {permission_id} is already bound to role {role_id}"
            )));
        }
        Ok(Binding {
            role_id,
            permission_id,
        })
    }

    #[instrument(skip(self), fields(role_id = %role_id, permission_id = %permission_id), err)]
    async fn delete_binding(&self, role_id: RoleId, permission_id: PermissionId) -> StoreResult<()> {
        let deleted = sqlx::query(
            "DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2",
        )
        .bind(role_id.get())
        .bind(permission_id.get())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_binding", e))?
        .rows_affected();

        if deleted == 0 {
            return Err(StoreError::NotFound(format!(
                "binding of permission {permission_id} to role {role_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BanStore for PostgresEntityStore {
    #[instrument(
        skip(self, ban),
        fields(user_id = %ban.user, permission_id = %ban.permission_id),
        err
    )]
    async fn insert_ban(&self, ban: NewBan) -> StoreResult<UserBan> {
        let sql = format!(
            r#"
            INSERT INTO user_bans (user_id, permission_id, reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (user_id, permission_id) DO NOTHING
            RETURNING {BAN_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(ban.user.as_str())
            .bind(ban.permission_id.get())
            .bind(ban.reason.as_str())
            .bind(ban.at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::NotFound(format!("permission {}", ban.permission_id))
                } else {
                    map_sqlx_error("insert_ban", e)
                }
            })?
            .ok_or_else(|| {
                StoreError::Conflict(format!(
                    "user '{}' is already banned from permission {}",
                    ban.user, ban.permission_id
                ))
            })?;
        decode::<UserBanRow>(&row).map(Into::into)
    }

    #[instrument(skip(self), fields(ban_id = %id))]
    async fn ban_by_id(&self, id: BanId) -> StoreResult<UserBan> {
        let sql = format!("SELECT {BAN_COLUMNS} FROM user_bans WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ban_by_id", e))?
            .ok_or_else(|| StoreError::NotFound(format!("ban {id}")))?;
        decode::<UserBanRow>(&row).map(Into::into)
    }

    #[instrument(skip(self), fields(user_id = %user, permission_id = %permission_id))]
    async fn ban_for(&self, user: &UserRef, permission_id: PermissionId) -> StoreResult<UserBan> {
        let sql = format!(
            "SELECT {BAN_COLUMNS} FROM user_bans WHERE user_id = $1 AND permission_id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(user.as_str())
            .bind(permission_id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ban_for", e))?
            .ok_or_else(|| {
                StoreError::NotFound(format!("ban of user '{user}' on permission {permission_id}"))
            })?;
        decode::<UserBanRow>(&row).map(Into::into)
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn bans_for_user(&self, user: &UserRef) -> StoreResult<Vec<UserBan>> {
        let sql = format!("SELECT {BAN_COLUMNS} FROM user_bans WHERE user_id = $1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(user.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("bans_for_user", e))?;
        decode_all::<UserBanRow, UserBan>(&rows)
    }

    #[instrument(skip(self))]
    async fn list_bans(&self) -> StoreResult<Vec<UserBan>> {
        let sql = format!("SELECT {BAN_COLUMNS} FROM user_bans ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_bans", e))?;
        decode_all::<UserBanRow, UserBan>(&rows)
    }

    #[instrument(skip(self, reason), fields(ban_id = %id), err)]
    async fn update_ban_reason(
        &self,
        id: BanId,
        reason: &BanReason,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<UserBan> {
        let sql = format!(
            "UPDATE user_bans SET reason = $2, updated_at = $3 WHERE id = $1 RETURNING {BAN_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(reason.as_str())
            .bind(updated_at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_ban_reason", e))?
            .ok_or_else(|| StoreError::NotFound(format!("ban {id}")))?;
        decode::<UserBanRow>(&row).map(Into::into)
    }

    #[instrument(skip(self), fields(user_id = %user, permission_id = %permission_id), err)]
    async fn delete_ban(&self, user: &UserRef, permission_id: PermissionId) -> StoreResult<()> {
        let deleted = sqlx::query("DELETE FROM user_bans WHERE user_id = $1 AND permission_id = $2")
            .bind(user.as_str())
            .bind(permission_id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_ban", e))?
            .rows_affected();

        if deleted == 0 {
            return Err(StoreError::NotFound(format!(
                "ban of user '{user}' on permission {permission_id}"
            )));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn bans_created_since(
        &self,
        cutoff: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<UserBan>> {
        let sql = format!(
            r#"
            SELECT {BAN_COLUMNS}
            FROM user_bans
            WHERE $1::timestamptz IS NULL OR created_at > $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        );
        // LIMIT NULL means no limit.
        let limit = limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX));
        let rows = sqlx::query(&sql)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("bans_created_since", e))?;
        decode_all::<UserBanRow, UserBan>(&rows)
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn has_code(err: &sqlx::Error, expected: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == expected;
        }
    }
    false
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_code(err, "23505")
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    has_code(err, "23503")
}

fn decode<'r, T>(row: &'r sqlx::postgres::PgRow) -> StoreResult<T>
where
    T: FromRow<'r, sqlx::postgres::PgRow>,
{
    T::from_row(row).map_err(|e| StoreError::Unavailable(format!("failed to decode row: {e}")))
}

fn decode_all<R, T>(rows: &[sqlx::postgres::PgRow]) -> StoreResult<Vec<T>>
where
    R: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Into<T>,
{
    rows.iter().map(|row| decode::<R>(row).map(Into::into)).collect()
}

// SQLx row types

#[derive(Debug)]
struct RoleRow {
    id: i64,
    name: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for RoleRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(RoleRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: RoleId::new(row.id),
            name: row.name,
        }
    }
}

#[derive(Debug)]
struct PermissionRow {
    id: i64,
    name: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for PermissionRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(PermissionRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Permission {
            id: PermissionId::new(row.id),
            name: row.name,
        }
    }
}

#[derive(Debug)]
struct UserBanRow {
    id: i64,
    user_id: String,
    permission_id: i64,
    reason: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for UserBanRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserBanRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            permission_id: row.try_get("permission_id")?,
            reason: row.try_get("reason")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<UserBanRow> for UserBan {
    fn from(row: UserBanRow) -> Self {
        UserBan {
            id: BanId::new(row.id),
            user_id: row.user_id,
            permission_id: PermissionId::new(row.permission_id),
            reason: row.reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_unavailable() {
        let err = map_sqlx_error("list_roles", sqlx::Error::PoolClosed);
        assert_eq!(
            err,
            StoreError::Unavailable("connection pool closed in list_roles".to_string())
        );
    }

    #[test]
    fn non_database_errors_are_not_constraint_violations() {
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
    }
}

//! Test store that wraps the in-memory tables and fails chosen operations
//! with `Unavailable`, standing in for a backend outage.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gatekeep_core::{BanId, PermissionId, RoleId};

use super::{
    BanStore, BindingStore, InMemoryEntityStore, PermissionStore, RoleStore, StoreError,
    StoreResult,
};
use crate::bans::{NewBan, UserBan};
use crate::permissions::{Permission, PermissionWithRoles};
use crate::roles::{Binding, Role, RoleWithPermissions};
use crate::validation::{BanReason, PermissionName, RoleName, UserRef};

#[derive(Debug, Default)]
pub struct FailingStore {
    inner: InMemoryEntityStore,
    failing: Mutex<HashSet<&'static str>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// From now on `operation` returns `Unavailable`.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    fn guard(&self, operation: &'static str) -> StoreResult<()> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(StoreError::Unavailable(format!("{operation}: connection reset")));
        }
        Ok(())
    }
}

#[async_trait]
impl RoleStore for FailingStore {
    async fn insert_role(&self, name: &RoleName) -> StoreResult<Role> {
        self.guard("insert_role")?;
        self.inner.insert_role(name).await
    }

    async fn role_by_id(&self, id: RoleId) -> StoreResult<Role> {
        self.guard("role_by_id")?;
        self.inner.role_by_id(id).await
    }

    async fn role_by_name(&self, name: &str) -> StoreResult<Role> {
        self.guard("role_by_name")?;
        self.inner.role_by_name(name).await
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        self.guard("list_roles")?;
        self.inner.list_roles().await
    }

    async fn rename_role(&self, id: RoleId, name: &RoleName) -> StoreResult<Role> {
        self.guard("rename_role")?;
        self.inner.rename_role(id, name).await
    }

    async fn delete_role(&self, id: RoleId) -> StoreResult<()> {
        self.guard("delete_role")?;
        self.inner.delete_role(id).await
    }

    async fn role_with_permissions(&self, id: RoleId) -> StoreResult<RoleWithPermissions> {
        self.guard("role_with_permissions")?;
        self.inner.role_with_permissions(id).await
    }
}

#[async_trait]
impl PermissionStore for FailingStore {
    async fn insert_permission(&self, name: &PermissionName) -> StoreResult<Permission> {
        self.guard("insert_permission")?;
        self.inner.insert_permission(name).await
    }

    async fn permission_by_id(&self, id: PermissionId) -> StoreResult<Permission> {
        self.guard("permission_by_id")?;
        self.inner.permission_by_id(id).await
    }

    async fn permission_by_name(&self, name: &str) -> StoreResult<Permission> {
        self.guard("permission_by_name")?;
        self.inner.permission_by_name(name).await
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        self.guard("list_permissions")?;
        self.inner.list_permissions().await
    }

    async fn rename_permission(
        &self,
        id: PermissionId,
        name: &PermissionName,
    ) -> StoreResult<Permission> {
        self.guard("rename_permission")?;
        self.inner.rename_permission(id, name).await
    }

    async fn delete_permission(&self, id: PermissionId) -> StoreResult<()> {
        self.guard("delete_permission")?;
        self.inner.delete_permission(id).await
    }

    async fn permission_with_roles(&self, id: PermissionId) -> StoreResult<PermissionWithRoles> {
        self.guard("permission_with_roles")?;
        self.inner.permission_with_roles(id).await
    }
}

#[async_trait]
impl BindingStore for FailingStore {
    async fn insert_binding(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<Binding> {
        self.guard("insert_binding")?;
        self.inner.insert_binding(role_id, permission_id).await
    }

    async fn delete_binding(&self, role_id: RoleId, permission_id: PermissionId) -> StoreResult<()> {
        self.guard("delete_binding")?;
        self.inner.delete_binding(role_id, permission_id).await
    }
}

#[async_trait]
impl BanStore for FailingStore {
    async fn insert_ban(&self, ban: NewBan) -> StoreResult<UserBan> {
        self.guard("insert_ban")?;
        self.inner.insert_ban(ban).await
    }

    async fn ban_by_id(&self, id: BanId) -> StoreResult<UserBan> {
        self.guard("ban_by_id")?;
        self.inner.ban_by_id(id).await
    }

    async fn ban_for(&self, user: &UserRef, permission_id: PermissionId) -> StoreResult<UserBan> {
        self.guard("ban_for")?;
        self.inner.ban_for(user, permission_id).await
    }

    async fn bans_for_user(&self, user: &UserRef) -> StoreResult<Vec<UserBan>> {
        self.guard("bans_for_user")?;
        self.inner.bans_for_user(user).await
    }

    async fn list_bans(&self) -> StoreResult<Vec<UserBan>> {
        self.guard("list_bans")?;
        self.inner.list_bans().await
    }

    async fn update_ban_reason(
        &self,
        id: BanId,
        reason: &BanReason,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<UserBan> {
        self.guard("update_ban_reason")?;
        self.inner.update_ban_reason(id, reason, updated_at).await
    }

    async fn delete_ban(&self, user: &UserRef, permission_id: PermissionId) -> StoreResult<()> {
        self.guard("delete_ban")?;
        self.inner.delete_ban(user, permission_id).await
    }

    async fn bans_created_since(
        &self,
        cutoff: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<UserBan>> {
        self.guard("bans_created_since")?;
        self.inner.bans_created_since(cutoff, limit).await
    }
}

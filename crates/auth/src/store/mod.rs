//! Persistence contract consumed by the authorization core.
//!
//! The store owns durability and the storage-level constraints the core
//! delegates to it:
//! - role and permission names are unique
//! - a (role, permission) binding exists at most once
//! - a (user, permission) ban exists at most once
//! - bindings and bans never reference a missing role/permission
//!
//! Implementations must run every method atomically (check and write under the
//! same lock or transaction) and must report absence as [`StoreError::NotFound`],
//! never as a generic failure.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use gatekeep_core::{BanId, DomainError, PermissionId, RoleId};

use crate::bans::{NewBan, UserBan};
use crate::permissions::{Permission, PermissionWithRoles};
use crate::roles::{Binding, Role, RoleWithPermissions};
use crate::validation::{BanReason, PermissionName, RoleName, UserRef};

pub mod in_memory;

#[cfg(test)]
pub(crate) mod failing;

pub use in_memory::InMemoryEntityStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => DomainError::not_found(what),
            StoreError::Conflict(msg) => DomainError::conflict(msg),
            StoreError::Unavailable(msg) => DomainError::unavailable(msg),
        }
    }
}

/// Turn "absent" into `None` while keeping real failures as errors.
pub trait StoreResultExt<T> {
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Insert a role; `Conflict` if the name is taken.
    async fn insert_role(&self, name: &RoleName) -> StoreResult<Role>;
    async fn role_by_id(&self, id: RoleId) -> StoreResult<Role>;
    async fn role_by_name(&self, name: &str) -> StoreResult<Role>;
    /// All roles in ascending id order.
    async fn list_roles(&self) -> StoreResult<Vec<Role>>;
    /// `NotFound` if the id is absent, `Conflict` if another role owns the name.
    async fn rename_role(&self, id: RoleId, name: &RoleName) -> StoreResult<Role>;
    /// Delete the role together with every binding that references it.
    async fn delete_role(&self, id: RoleId) -> StoreResult<()>;
    async fn role_with_permissions(&self, id: RoleId) -> StoreResult<RoleWithPermissions>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn insert_permission(&self, name: &PermissionName) -> StoreResult<Permission>;
    async fn permission_by_id(&self, id: PermissionId) -> StoreResult<Permission>;
    async fn permission_by_name(&self, name: &str) -> StoreResult<Permission>;
    async fn list_permissions(&self) -> StoreResult<Vec<Permission>>;
    async fn rename_permission(
        &self,
        id: PermissionId,
        name: &PermissionName,
    ) -> StoreResult<Permission>;
    /// Delete the permission together with its bindings and bans.
    async fn delete_permission(&self, id: PermissionId) -> StoreResult<()>;
    async fn permission_with_roles(&self, id: PermissionId) -> StoreResult<PermissionWithRoles>;
}

#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Uniqueness-checked insert: `Conflict` on duplicate, `NotFound` if either
    /// side is missing.
    async fn insert_binding(&self, role_id: RoleId, permission_id: PermissionId)
    -> StoreResult<Binding>;
    /// `NotFound` if the binding does not exist.
    async fn delete_binding(&self, role_id: RoleId, permission_id: PermissionId)
    -> StoreResult<()>;
}

#[async_trait]
pub trait BanStore: Send + Sync {
    /// Uniqueness-checked insert: `Conflict` if (user, permission) is already
    /// banned, `NotFound` if the permission is missing.
    async fn insert_ban(&self, ban: NewBan) -> StoreResult<UserBan>;
    async fn ban_by_id(&self, id: BanId) -> StoreResult<UserBan>;
    async fn ban_for(&self, user: &UserRef, permission_id: PermissionId) -> StoreResult<UserBan>;
    /// Bans of one user in ascending id order.
    async fn bans_for_user(&self, user: &UserRef) -> StoreResult<Vec<UserBan>>;
    /// All bans in ascending id order.
    async fn list_bans(&self) -> StoreResult<Vec<UserBan>>;
    async fn update_ban_reason(
        &self,
        id: BanId,
        reason: &BanReason,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<UserBan>;
    /// `NotFound` if no ban matches.
    async fn delete_ban(&self, user: &UserRef, permission_id: PermissionId) -> StoreResult<()>;
    /// Bans created strictly after `cutoff` (every ban when `None`), newest
    /// first, at most `limit`.
    async fn bans_created_since(
        &self,
        cutoff: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<UserBan>>;
}

/// Everything the core needs from storage.
pub trait EntityStore: RoleStore + PermissionStore + BindingStore + BanStore {}

impl<T> EntityStore for T where T: RoleStore + PermissionStore + BindingStore + BanStore {}

#[async_trait]
impl<S> RoleStore for Arc<S>
where
    S: RoleStore + ?Sized,
{
    async fn insert_role(&self, name: &RoleName) -> StoreResult<Role> {
        (**self).insert_role(name).await
    }

    async fn role_by_id(&self, id: RoleId) -> StoreResult<Role> {
        (**self).role_by_id(id).await
    }

    async fn role_by_name(&self, name: &str) -> StoreResult<Role> {
        (**self).role_by_name(name).await
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        (**self).list_roles().await
    }

    async fn rename_role(&self, id: RoleId, name: &RoleName) -> StoreResult<Role> {
        (**self).rename_role(id, name).await
    }

    async fn delete_role(&self, id: RoleId) -> StoreResult<()> {
        (**self).delete_role(id).await
    }

    async fn role_with_permissions(&self, id: RoleId) -> StoreResult<RoleWithPermissions> {
        (**self).role_with_permissions(id).await
    }
}

#[async_trait]
impl<S> PermissionStore for Arc<S>
where
    S: PermissionStore + ?Sized,
{
    async fn insert_permission(&self, name: &PermissionName) -> StoreResult<Permission> {
        (**self).insert_permission(name).await
    }

    async fn permission_by_id(&self, id: PermissionId) -> StoreResult<Permission> {
        (**self).permission_by_id(id).await
    }

    async fn permission_by_name(&self, name: &str) -> StoreResult<Permission> {
        (**self).permission_by_name(name).await
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        (**self).list_permissions().await
    }

    async fn rename_permission(
        &self,
        id: PermissionId,
        name: &PermissionName,
    ) -> StoreResult<Permission> {
        (**self).rename_permission(id, name).await
    }

    async fn delete_permission(&self, id: PermissionId) -> StoreResult<()> {
        (**self).delete_permission(id).await
    }

    async fn permission_with_roles(&self, id: PermissionId) -> StoreResult<PermissionWithRoles> {
        (**self).permission_with_roles(id).await
    }
}

#[async_trait]
impl<S> BindingStore for Arc<S>
where
    S: BindingStore + ?Sized,
{
    async fn insert_binding(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<Binding> {
        (**self).insert_binding(role_id, permission_id).await
    }

    async fn delete_binding(&self, role_id: RoleId, permission_id: PermissionId) -> StoreResult<()> {
        (**self).delete_binding(role_id, permission_id).await
    }
}

#[async_trait]
impl<S> BanStore for Arc<S>
where
    S: BanStore + ?Sized,
{
    async fn insert_ban(&self, ban: NewBan) -> StoreResult<UserBan> {
        (**self).insert_ban(ban).await
    }

    async fn ban_by_id(&self, id: BanId) -> StoreResult<UserBan> {
        (**self).ban_by_id(id).await
    }

    async fn ban_for(&self, user: &UserRef, permission_id: PermissionId) -> StoreResult<UserBan> {
        (**self).ban_for(user, permission_id).await
    }

    async fn bans_for_user(&self, user: &UserRef) -> StoreResult<Vec<UserBan>> {
        (**self).bans_for_user(user).await
    }

    async fn list_bans(&self) -> StoreResult<Vec<UserBan>> {
        (**self).list_bans().await
    }

    async fn update_ban_reason(
        &self,
        id: BanId,
        reason: &BanReason,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<UserBan> {
        (**self).update_ban_reason(id, reason, updated_at).await
    }

    async fn delete_ban(&self, user: &UserRef, permission_id: PermissionId) -> StoreResult<()> {
        (**self).delete_ban(user, permission_id).await
    }

    async fn bans_created_since(
        &self,
        cutoff: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<UserBan>> {
        (**self).bans_created_since(cutoff, limit).await
    }
}

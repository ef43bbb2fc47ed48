//! Roles and the role↔permission binding.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gatekeep_core::{DomainError, DomainResult, Entity, PermissionId, RoleId};

use crate::permissions::Permission;
use crate::store::EntityStore;
use crate::validation::{lookup_key, RoleName, MAX_NAME_CHARS};

/// A named collection of granted permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> RoleId {
        self.id
    }
}

/// A role together with every permission currently bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// Grant of one permission through one role. At most one per pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

/// Role management operations.
#[derive(Debug, Clone)]
pub struct RoleService<S> {
    store: S,
}

impl<S> RoleService<S>
where
    S: EntityStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_role(&self, name: &str) -> DomainResult<Role> {
        let name = RoleName::parse(name)?;
        let role = self.store.insert_role(&name).await?;
        info!(role_id = %role.id, name = %role.name, "role created");
        Ok(role)
    }

    pub async fn get_role(&self, id: RoleId) -> DomainResult<Role> {
        let id = id.ensure_positive()?;
        debug!(role_id = %id, "get role");
        Ok(self.store.role_by_id(id).await?)
    }

    pub async fn get_role_by_name(&self, name: &str) -> DomainResult<Role> {
        match lookup_key(name, "role name", MAX_NAME_CHARS)? {
            Some(name) => Ok(self.store.role_by_name(name).await?),
            None => Err(DomainError::not_found(format!("role '{name}'"))),
        }
    }

    pub async fn list_roles(&self) -> DomainResult<Vec<Role>> {
        Ok(self.store.list_roles().await?)
    }

    pub async fn update_role(&self, id: RoleId, name: &str) -> DomainResult<Role> {
        let id = id.ensure_positive()?;
        let name = RoleName::parse(name)?;
        let role = self.store.rename_role(id, &name).await?;
        info!(role_id = %role.id, name = %role.name, "role renamed");
        Ok(role)
    }

    /// Deletes the role and, in the same store transaction, all of its bindings.
    pub async fn delete_role(&self, id: RoleId) -> DomainResult<()> {
        let id = id.ensure_positive()?;
        self.store.delete_role(id).await?;
        info!(role_id = %id, "role deleted");
        Ok(())
    }

    pub async fn get_role_with_permissions(&self, id: RoleId) -> DomainResult<RoleWithPermissions> {
        let id = id.ensure_positive()?;
        Ok(self.store.role_with_permissions(id).await?)
    }

    pub async fn add_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> DomainResult<Binding> {
        let role_id = role_id.ensure_positive()?;
        let permission_id = permission_id.ensure_positive()?;

        // Precise NotFound first; the store's uniqueness check is what decides Conflict.
        self.store.role_by_id(role_id).await?;
        self.store.permission_by_id(permission_id).await?;

        let binding = self.store.insert_binding(role_id, permission_id).await?;
        info!(role_id = %role_id, permission_id = %permission_id, "permission bound to role");
        Ok(binding)
    }

    pub async fn remove_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> DomainResult<()> {
        let role_id = role_id.ensure_positive()?;
        let permission_id = permission_id.ensure_positive()?;
        self.store.delete_binding(role_id, permission_id).await?;
        info!(role_id = %role_id, permission_id = %permission_id, "permission unbound from role");
        Ok(())
    }
}

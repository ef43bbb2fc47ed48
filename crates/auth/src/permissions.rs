//! Permissions: named capabilities granted through roles and denied through bans.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gatekeep_core::{DomainError, DomainResult, Entity, PermissionId};

use crate::roles::Role;
use crate::store::EntityStore;
use crate::validation::{lookup_key, PermissionName, MAX_NAME_CHARS};

/// A capability that can be granted (binding) or denied (ban).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> PermissionId {
        self.id
    }
}

/// A permission together with the roles that currently grant it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionWithRoles {
    #[serde(flatten)]
    pub permission: Permission,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone)]
pub struct PermissionService<S> {
    store: S,
}

impl<S> PermissionService<S>
where
    S: EntityStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_permission(&self, name: &str) -> DomainResult<Permission> {
        let name = PermissionName::parse(name)?;
        let permission = self.store.insert_permission(&name).await?;
        info!(permission_id = %permission.id, name = %permission.name, "permission created");
        Ok(permission)
    }

    pub async fn get_permission(&self, id: PermissionId) -> DomainResult<Permission> {
        let id = id.ensure_positive()?;
        debug!(permission_id = %id, "get permission");
        Ok(self.store.permission_by_id(id).await?)
    }

    pub async fn get_permission_by_name(&self, name: &str) -> DomainResult<Permission> {
        match lookup_key(name, "permission name", MAX_NAME_CHARS)? {
            Some(name) => Ok(self.store.permission_by_name(name).await?),
            None => Err(DomainError::not_found(format!("permission '{name}'"))),
        }
    }

    pub async fn list_permissions(&self) -> DomainResult<Vec<Permission>> {
        Ok(self.store.list_permissions().await?)
    }

    pub async fn update_permission(&self, id: PermissionId, name: &str) -> DomainResult<Permission> {
        let id = id.ensure_positive()?;
        let name = PermissionName::parse(name)?;
        let permission = self.store.rename_permission(id, &name).await?;
        info!(permission_id = %permission.id, name = %permission.name, "permission renamed");
        Ok(permission)
    }

    /// Deletes the permission with its bindings and every ban that references it.
    pub async fn delete_permission(&self, id: PermissionId) -> DomainResult<()> {
        let id = id.ensure_positive()?;
        self.store.delete_permission(id).await?;
        info!(permission_id = %id, "permission deleted");
        Ok(())
    }

    pub async fn get_permission_with_roles(
        &self,
        id: PermissionId,
    ) -> DomainResult<PermissionWithRoles> {
        let id = id.ensure_positive()?;
        Ok(self.store.permission_with_roles(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gatekeep_core::DomainError;

    use super::*;
    use crate::roles::RoleService;
    use crate::store::InMemoryEntityStore;

    #[tokio::test]
    async fn crud_round() {
        let perms = PermissionService::new(Arc::new(InMemoryEntityStore::new()));

        let ban_user = perms.create_permission("ban_user").await.unwrap();
        let unban_user = perms.create_permission("unban_user").await.unwrap();
        assert!(ban_user.id < unban_user.id);

        assert_eq!(perms.get_permission(ban_user.id).await.unwrap(), ban_user);
        assert_eq!(perms.get_permission_by_name("unban_user").await.unwrap(), unban_user);
        assert_eq!(perms.list_permissions().await.unwrap(), vec![ban_user.clone(), unban_user.clone()]);

        assert!(perms.create_permission("ban_user").await.unwrap_err().is_conflict());
        assert!(perms.update_permission(unban_user.id, "ban_user").await.unwrap_err().is_conflict());

        let renamed = perms.update_permission(unban_user.id, "lift_ban").await.unwrap();
        assert_eq!(renamed.id, unban_user.id);

        perms.delete_permission(ban_user.id).await.unwrap();
        assert!(perms.get_permission(ban_user.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn invalid_inputs() {
        let perms = PermissionService::new(Arc::new(InMemoryEntityStore::new()));
        assert!(matches!(perms.create_permission("").await, Err(DomainError::InvalidInput(_))));
        assert!(matches!(
            perms.create_permission(&"p".repeat(101)).await,
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            perms.delete_permission(PermissionId::new(0)).await,
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn lookup_of_unstorable_name_is_not_found() {
        let perms = PermissionService::new(Arc::new(InMemoryEntityStore::new()));
        perms.create_permission("ban_user").await.unwrap();

        let err = perms.get_permission_by_name(&"p".repeat(101)).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(perms.get_permission_by_name("ban\0user").await.unwrap_err().is_not_found());
        assert!(matches!(
            perms.get_permission_by_name(" ").await,
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn with_roles_lists_granting_roles_in_id_order() {
        let store = Arc::new(InMemoryEntityStore::new());
        let roles = RoleService::new(store.clone());
        let perms = PermissionService::new(store);

        let admin = roles.create_role("admin").await.unwrap();
        let player = roles.create_role("player").await.unwrap();
        let perm = perms.create_permission("view_roles").await.unwrap();

        roles.add_permission_to_role(player.id, perm.id).await.unwrap();
        roles.add_permission_to_role(admin.id, perm.id).await.unwrap();

        let view = perms.get_permission_with_roles(perm.id).await.unwrap();
        assert_eq!(view.permission, perm);
        assert_eq!(view.roles, vec![admin, player]);
    }
}

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gatekeep_core::{BanId, PermissionId, RoleId, ValueObject};

use super::{BanStore, BindingStore, PermissionStore, RoleStore, StoreError, StoreResult};
use crate::bans::{NewBan, UserBan};
use crate::permissions::{Permission, PermissionWithRoles};
use crate::roles::{Binding, Role, RoleWithPermissions};
use crate::validation::{BanReason, PermissionName, RoleName, UserRef};

#[derive(Debug, Default)]
struct Tables {
    roles: BTreeMap<RoleId, Role>,
    role_names: HashMap<String, RoleId>,
    permissions: BTreeMap<PermissionId, Permission>,
    permission_names: HashMap<String, PermissionId>,
    bindings: BTreeSet<(RoleId, PermissionId)>,
    bans: BTreeMap<BanId, UserBan>,
    ban_keys: HashMap<(String, PermissionId), BanId>,
    last_role_id: i64,
    last_permission_id: i64,
    last_ban_id: i64,
}

impl Tables {
    fn role(&self, id: RoleId) -> StoreResult<&Role> {
        self.roles
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("role {id}")))
    }

    fn permission(&self, id: PermissionId) -> StoreResult<&Permission> {
        self.permissions
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("permission {id}")))
    }
}

/// In-memory entity store.
///
/// Intended for tests/dev. All tables sit behind one lock, so every
/// check-then-write is atomic. Ids are never reused.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    tables: RwLock<Tables>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait]
impl RoleStore for InMemoryEntityStore {
    async fn insert_role(&self, name: &RoleName) -> StoreResult<Role> {
        let mut t = self.write()?;
        if t.role_names.contains_key(name.as_str()) {
            return Err(StoreError::Conflict(format!("role '{name}' already exists")));
        }
        t.last_role_id += 1;
        let role = Role {
            id: RoleId::new(t.last_role_id),
            name: name.as_str().to_string(),
        };
        t.role_names.insert(role.name.clone(), role.id);
        t.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn role_by_id(&self, id: RoleId) -> StoreResult<Role> {
        self.read()?.role(id).cloned()
    }

    async fn role_by_name(&self, name: &str) -> StoreResult<Role> {
        let t = self.read()?;
        let id = t
            .role_names
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::NotFound(format!("role '{name}'")))?;
        t.role(id).cloned()
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self.read()?.roles.values().cloned().collect())
    }

    async fn rename_role(&self, id: RoleId, name: &RoleName) -> StoreResult<Role> {
        let mut t = self.write()?;
        let old = t.role(id)?.name.clone();
        match t.role_names.get(name.as_str()) {
            Some(owner) if *owner != id => {
                return Err(StoreError::Conflict(format!("role '{name}' already exists")));
            }
            _ => {}
        }
        t.role_names.remove(&old);
        t.role_names.insert(name.as_str().to_string(), id);
        let role = t
            .roles
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("role {id}")))?;
        role.name = name.as_str().to_string();
        Ok(role.clone())
    }

    async fn delete_role(&self, id: RoleId) -> StoreResult<()> {
        let mut t = self.write()?;
        let role = t
            .roles
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("role {id}")))?;
        t.role_names.remove(&role.name);
        t.bindings.retain(|(r, _)| *r != id);
        Ok(())
    }

    async fn role_with_permissions(&self, id: RoleId) -> StoreResult<RoleWithPermissions> {
        let t = self.read()?;
        let role = t.role(id)?.clone();
        let permissions = t
            .bindings
            .iter()
            .filter(|(r, _)| *r == id)
            .filter_map(|(_, p)| t.permissions.get(p).cloned())
            .collect();
        Ok(RoleWithPermissions { role, permissions })
    }
}

#[async_trait]
impl PermissionStore for InMemoryEntityStore {
    async fn insert_permission(&self, name: &PermissionName) -> StoreResult<Permission> {
        let mut t = self.write()?;
        if t.permission_names.contains_key(name.as_str()) {
            return Err(StoreError::Conflict(format!(
                "permission '{name}' already exists"
            )));
        }
        t.last_permission_id += 1;
        let permission = Permission {
            id: PermissionId::new(t.last_permission_id),
            name: name.as_str().to_string(),
        };
        t.permission_names
            .insert(permission.name.clone(), permission.id);
        t.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn permission_by_id(&self, id: PermissionId) -> StoreResult<Permission> {
        self.read()?.permission(id).cloned()
    }

    async fn permission_by_name(&self, name: &str) -> StoreResult<Permission> {
        let t = self.read()?;
        let id = t
            .permission_names
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::NotFound(format!("permission '{name}'")))?;
        t.permission(id).cloned()
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        Ok(self.read()?.permissions.values().cloned().collect())
    }

    async fn rename_permission(
        &self,
        id: PermissionId,
        name: &PermissionName,
    ) -> StoreResult<Permission> {
        let mut t = self.write()?;
        let old = t.permission(id)?.name.clone();
        match t.permission_names.get(name.as_str()) {
            Some(owner) if *owner != id => {
                return Err(StoreError::Conflict(format!(
                    "permission '{name}' already exists"
                )));
            }
            _ => {}
        }
        t.permission_names.remove(&old);
        t.permission_names.insert(name.as_str().to_string(), id);
        let permission = t
            .permissions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("permission {id}")))?;
        permission.name = name.as_str().to_string();
        Ok(permission.clone())
    }

    async fn delete_permission(&self, id: PermissionId) -> StoreResult<()> {
        let mut t = self.write()?;
        let permission = t
            .permissions
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("permission {id}")))?;
        t.permission_names.remove(&permission.name);
        t.bindings.retain(|(_, p)| *p != id);
        t.bans.retain(|_, ban| ban.permission_id != id);
        t.ban_keys.retain(|(_, p), _| *p != id);
        Ok(())
    }

    async fn permission_with_roles(&self, id: PermissionId) -> StoreResult<PermissionWithRoles> {
        let t = self.read()?;
        let permission = t.permission(id)?.clone();
        // Bindings are ordered by role id first, so roles come out ascending.
        let roles = t
            .bindings
            .iter()
            .filter(|(_, p)| *p == id)
            .filter_map(|(r, _)| t.roles.get(r).cloned())
            .collect();
        Ok(PermissionWithRoles { permission, roles })
    }
}

#[async_trait]
impl BindingStore for InMemoryEntityStore {
    async fn insert_binding(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<Binding> {
        let mut t = self.write()?;
        t.role(role_id)?;
        t.permission(permission_id)?;
        if !t.bindings.insert((role_id, permission_id)) {
            return Err(StoreError::Conflict(format!(
                "permission {permission_id} is already bound to role {role_id}"
            )));
        }
        Ok(Binding {
            role_id,
            permission_id,
        })
    }

    async fn delete_binding(&self, role_id: RoleId, permission_id: PermissionId) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.bindings.remove(&(role_id, permission_id)) {
            return Err(StoreError::NotFound(format!(
                "binding of permission {permission_id} to role {role_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BanStore for InMemoryEntityStore {
    async fn insert_ban(&self, ban: NewBan) -> StoreResult<UserBan> {
        let mut t = self.write()?;
        t.permission(ban.permission_id)?;
        let key = (ban.user.as_str().to_string(), ban.permission_id);
        if t.ban_keys.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "user '{}' is already banned from permission {}",
                ban.user, ban.permission_id
            )));
        }
        t.last_ban_id += 1;
        let stored = UserBan {
            id: BanId::new(t.last_ban_id),
            user_id: ban.user.into_inner(),
            permission_id: ban.permission_id,
            reason: ban.reason.into_inner(),
            created_at: ban.at,
            updated_at: ban.at,
        };
        t.ban_keys.insert(key, stored.id);
        t.bans.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn ban_by_id(&self, id: BanId) -> StoreResult<UserBan> {
        self.read()?
            .bans
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("ban {id}")))
    }

    async fn ban_for(&self, user: &UserRef, permission_id: PermissionId) -> StoreResult<UserBan> {
        let t = self.read()?;
        t.ban_keys
            .get(&(user.as_str().to_string(), permission_id))
            .and_then(|id| t.bans.get(id))
            .cloned()
            .ok_or_else(|| {
                StoreError::NotFound(format!("ban of user '{user}' on permission {permission_id}"))
            })
    }

    async fn bans_for_user(&self, user: &UserRef) -> StoreResult<Vec<UserBan>> {
        Ok(self
            .read()?
            .bans
            .values()
            .filter(|b| b.user_id == user.as_str())
            .cloned()
            .collect())
    }

    async fn list_bans(&self) -> StoreResult<Vec<UserBan>> {
        Ok(self.read()?.bans.values().cloned().collect())
    }

    async fn update_ban_reason(
        &self,
        id: BanId,
        reason: &BanReason,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<UserBan> {
        let mut t = self.write()?;
        let ban = t
            .bans
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("ban {id}")))?;
        ban.reason = reason.as_str().to_string();
        ban.updated_at = updated_at;
        Ok(ban.clone())
    }

    async fn delete_ban(&self, user: &UserRef, permission_id: PermissionId) -> StoreResult<()> {
        let mut t = self.write()?;
        let id = t
            .ban_keys
            .remove(&(user.as_str().to_string(), permission_id))
            .ok_or_else(|| {
                StoreError::NotFound(format!("ban of user '{user}' on permission {permission_id}"))
            })?;
        t.bans.remove(&id);
        Ok(())
    }

    async fn bans_created_since(
        &self,
        cutoff: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<UserBan>> {
        let t = self.read()?;
        let mut recent: Vec<UserBan> = t
            .bans
            .values()
            .filter(|b| cutoff.map_or(true, |c| b.created_at > c))
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        if let Some(n) = limit {
            recent.truncate(n);
        }
        Ok(recent)
    }
}

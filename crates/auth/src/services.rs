//! Bundle of the core services sharing one store.

use std::sync::Arc;

use gatekeep_core::Clock;

use crate::bans::BanService;
use crate::permissions::PermissionService;
use crate::roles::RoleService;
use crate::store::EntityStore;

#[derive(Clone)]
pub struct AuthzServices<S> {
    pub roles: RoleService<S>,
    pub permissions: PermissionService<S>,
    pub bans: BanService<S>,
}

impl<S> AuthzServices<S>
where
    S: EntityStore + Clone,
{
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            roles: RoleService::new(store.clone()),
            permissions: PermissionService::new(store.clone()),
            bans: BanService::new(store, clock),
        }
    }
}

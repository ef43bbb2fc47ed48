//! Default roles and permissions for a fresh deployment.

use serde::Serialize;
use tracing::info;

use gatekeep_core::{DomainError, DomainResult};

use crate::services::AuthzServices;
use crate::store::EntityStore;

pub const DEFAULT_PERMISSIONS: &[&str] = &[
    "create_game_room",
    "admin",
    "ban_user",
    "unban_user",
    "view_banned_users",
    "assign_roles",
    "remove_roles",
    "view_roles",
    "create_permissions",
    "delete_permissions",
    "view_permissions",
    "assign_permissions",
    "remove_permissions",
];

pub const DEFAULT_ROLES: &[&str] = &["player", "admin"];

/// Names created by one seeding run. Names that already existed are skipped.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub permissions_created: Vec<String>,
    pub roles_created: Vec<String>,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        self.permissions_created.is_empty() && self.roles_created.is_empty()
    }
}

/// Create every default permission and role that does not exist yet.
pub async fn seed_defaults<S>(services: &AuthzServices<S>) -> DomainResult<SeedReport>
where
    S: EntityStore + Clone,
{
    let mut report = SeedReport::default();

    for name in DEFAULT_PERMISSIONS {
        match services.permissions.create_permission(name).await {
            Ok(p) => report.permissions_created.push(p.name),
            Err(DomainError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }

    for name in DEFAULT_ROLES {
        match services.roles.create_role(name).await {
            Ok(r) => report.roles_created.push(r.name),
            Err(DomainError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }

    info!(
        permissions = report.permissions_created.len(),
        roles = report.roles_created.len(),
        "default data seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gatekeep_core::SystemClock;

    use super::*;
    use crate::store::InMemoryEntityStore;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let services = AuthzServices::new(Arc::new(InMemoryEntityStore::new()), Arc::new(SystemClock));

        let first = seed_defaults(&services).await.unwrap();
        assert_eq!(first.permissions_created.len(), DEFAULT_PERMISSIONS.len());
        assert_eq!(first.roles_created, vec!["player".to_string(), "admin".to_string()]);

        let second = seed_defaults(&services).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(
            services.permissions.list_permissions().await.unwrap().len(),
            DEFAULT_PERMISSIONS.len()
        );
    }

    #[tokio::test]
    async fn seeding_fills_gaps_only() {
        let services = AuthzServices::new(Arc::new(InMemoryEntityStore::new()), Arc::new(SystemClock));
        services.roles.create_role("admin").await.unwrap();

        let report = seed_defaults(&services).await.unwrap();
        assert_eq!(report.roles_created, vec!["player".to_string()]);
    }
}

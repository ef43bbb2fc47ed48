//! `gatekeep-auth`: the authorization core.
//!
//! Roles, permissions, role↔permission bindings and per-user bans, plus the
//! rules that keep them consistent. This crate is intentionally decoupled from
//! HTTP and from any concrete storage engine: it talks to storage only through
//! the traits in [`store`].

pub mod bans;
pub mod permissions;
pub mod roles;
pub mod seed;
pub mod services;
pub mod store;
pub mod validation;

pub use bans::{BanService, NewBan, UserBan, UserBanDetail, DEFAULT_RECENT_DAYS};
pub use permissions::{Permission, PermissionService, PermissionWithRoles};
pub use roles::{Binding, Role, RoleService, RoleWithPermissions};
pub use seed::{seed_defaults, SeedReport};
pub use services::AuthzServices;
pub use store::{
    BanStore, BindingStore, EntityStore, InMemoryEntityStore, PermissionStore, RoleStore,
    StoreError, StoreResult,
};
pub use validation::{BanReason, PermissionName, RoleName, UserRef};

//! `gatekeep-core`: foundation building blocks shared by every crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use clock::{Clock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BanId, PermissionId, RoleId};
pub use value_object::ValueObject;

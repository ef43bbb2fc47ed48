//! Entity store implementations.
//!
//! The in-memory store lives next to the persistence contract in
//! `gatekeep-auth`; it is re-exported here so callers pick a backend from one place.

pub mod postgres;

pub use gatekeep_auth::InMemoryEntityStore;
pub use postgres::PostgresEntityStore;

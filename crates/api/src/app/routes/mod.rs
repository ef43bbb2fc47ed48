use axum::Router;

pub mod bans;
pub mod permissions;
pub mod roles;
pub mod system;

/// Router for the versioned administrative API (nested under `/api/v1`).
pub fn router() -> Router {
    Router::new()
        .nest("/roles", roles::router())
        .nest("/permissions", permissions::router())
        .nest("/users", bans::user_router())
        .nest("/bans", bans::router())
}

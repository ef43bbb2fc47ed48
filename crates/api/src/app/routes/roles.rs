//! Role management endpoints, including role↔permission bindings.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};

use gatekeep_core::{PermissionId, RoleId};

use crate::app::errors::{domain_error_to_response, ApiResult};
use crate::app::{dto, services::AppServices};

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/by-name/:name", get(get_role_by_name))
        .route("/:id", get(get_role).put(update_role).delete(delete_role))
        .route(
            "/:id/permissions",
            get(get_role_with_permissions).post(add_permission),
        )
        .route("/:id/permissions/:permission_id", delete(remove_permission))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::NameRequest>, JsonRejection>,
) -> ApiResult {
    let body = dto::body(payload)?;
    let role = services
        .authz
        .roles
        .create_role(&body.name)
        .await
        .map_err(domain_error_to_response)?;
    Ok(dto::created("roles", role))
}

/// GET /roles
pub async fn list_roles(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let roles = services
        .authz
        .roles
        .list_roles()
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(roles).into_response())
}

/// GET /roles/by-name/:name
pub async fn get_role_by_name(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
) -> ApiResult {
    let role = services
        .authz
        .roles
        .get_role_by_name(&name)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(role).into_response())
}

/// GET /roles/:id
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: RoleId = dto::parse_id(&id, "role id")?;
    let role = services
        .authz
        .roles
        .get_role(id)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(role).into_response())
}

/// PUT /roles/:id
pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::NameRequest>, JsonRejection>,
) -> ApiResult {
    let id: RoleId = dto::parse_id(&id, "role id")?;
    let body = dto::body(payload)?;
    let role = services
        .authz
        .roles
        .update_role(id, &body.name)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(role).into_response())
}

/// DELETE /roles/:id (cascades to the role's bindings)
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: RoleId = dto::parse_id(&id, "role id")?;
    services
        .authz
        .roles
        .delete_role(id)
        .await
        .map_err(domain_error_to_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// GET /roles/:id/permissions
pub async fn get_role_with_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: RoleId = dto::parse_id(&id, "role id")?;
    let view = services
        .authz
        .roles
        .get_role_with_permissions(id)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(view).into_response())
}

/// POST /roles/:id/permissions
pub async fn add_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::BindPermissionRequest>, JsonRejection>,
) -> ApiResult {
    let role_id: RoleId = dto::parse_id(&id, "role id")?;
    let body = dto::body(payload)?;
    let binding = services
        .authz
        .roles
        .add_permission_to_role(role_id, PermissionId::new(body.permission_id))
        .await
        .map_err(domain_error_to_response)?;
    Ok((StatusCode::CREATED, Json(binding)).into_response())
}

/// DELETE /roles/:id/permissions/:permission_id
pub async fn remove_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, permission_id)): Path<(String, String)>,
) -> ApiResult {
    let role_id: RoleId = dto::parse_id(&id, "role id")?;
    let permission_id: PermissionId = dto::parse_id(&permission_id, "permission id")?;
    services
        .authz
        .roles
        .remove_permission_from_role(role_id, permission_id)
        .await
        .map_err(domain_error_to_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

//! Permission management endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use gatekeep_core::PermissionId;

use crate::app::errors::{domain_error_to_response, ApiResult};
use crate::app::{dto, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_permissions).post(create_permission))
        .route("/by-name/:name", get(get_permission_by_name))
        .route(
            "/:id",
            get(get_permission)
                .put(update_permission)
                .delete(delete_permission),
        )
        .route("/:id/roles", get(get_permission_with_roles))
}

/// POST /permissions
pub async fn create_permission(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::NameRequest>, JsonRejection>,
) -> ApiResult {
    let body = dto::body(payload)?;
    let permission = services
        .authz
        .permissions
        .create_permission(&body.name)
        .await
        .map_err(domain_error_to_response)?;
    Ok(dto::created("permissions", permission))
}

/// GET /permissions
pub async fn list_permissions(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let permissions = services
        .authz
        .permissions
        .list_permissions()
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(permissions).into_response())
}

/// GET /permissions/by-name/:name
pub async fn get_permission_by_name(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
) -> ApiResult {
    let permission = services
        .authz
        .permissions
        .get_permission_by_name(&name)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(permission).into_response())
}

/// GET /permissions/:id
pub async fn get_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: PermissionId = dto::parse_id(&id, "permission id")?;
    let permission = services
        .authz
        .permissions
        .get_permission(id)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(permission).into_response())
}

/// PUT /permissions/:id
pub async fn update_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::NameRequest>, JsonRejection>,
) -> ApiResult {
    let id: PermissionId = dto::parse_id(&id, "permission id")?;
    let body = dto::body(payload)?;
    let permission = services
        .authz
        .permissions
        .update_permission(id, &body.name)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(permission).into_response())
}

/// DELETE /permissions/:id (cascades to bindings and bans)
pub async fn delete_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: PermissionId = dto::parse_id(&id, "permission id")?;
    services
        .authz
        .permissions
        .delete_permission(id)
        .await
        .map_err(domain_error_to_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// GET /permissions/:id/roles
pub async fn get_permission_with_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: PermissionId = dto::parse_id(&id, "permission id")?;
    let view = services
        .authz
        .permissions
        .get_permission_with_roles(id)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(view).into_response())
}

//! User ban endpoints.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};

use gatekeep_core::{BanId, PermissionId};

use crate::app::errors::{domain_error_to_response, ApiResult};
use crate::app::{dto, services::AppServices};

// ─────────────────────────────────────────────────────────────────────────────
// Routers
// ─────────────────────────────────────────────────────────────────────────────

/// Per-user routes, nested under `/users`.
pub fn user_router() -> Router {
    Router::new()
        .route("/:user_id/bans", get(get_user_bans).post(ban_user))
        .route("/:user_id/bans/active", get(get_active_user_bans))
        .route("/:user_id/bans/check", get(check_ban))
        .route("/:user_id/bans/:permission_id", delete(unban_user))
}

/// Ban records, nested under `/bans`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(get_all_bans))
        .route("/recent", get(get_recent_bans))
        .route("/:id", get(get_ban).put(update_ban_reason))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /users/:user_id/bans
pub async fn ban_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
    payload: Result<Json<dto::BanUserRequest>, JsonRejection>,
) -> ApiResult {
    let body = dto::body(payload)?;
    let ban = services
        .authz
        .bans
        .ban_user(&user_id, PermissionId::new(body.permission_id), &body.reason)
        .await
        .map_err(domain_error_to_response)?;
    Ok(dto::created("bans", ban))
}

/// GET /users/:user_id/bans
pub async fn get_user_bans(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
) -> ApiResult {
    let bans = services
        .authz
        .bans
        .get_user_bans(&user_id)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(bans).into_response())
}

/// GET /users/:user_id/bans/active
pub async fn get_active_user_bans(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
) -> ApiResult {
    let bans = services
        .authz
        .bans
        .get_active_user_bans(&user_id)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(bans).into_response())
}

/// GET /users/:user_id/bans/check?permission_id=
pub async fn check_ban(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
    params: Result<Query<dto::BanCheckQuery>, QueryRejection>,
) -> ApiResult {
    let params = dto::query(params)?;
    let banned = services
        .authz
        .bans
        .is_user_banned(&user_id, PermissionId::new(params.permission_id))
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(dto::BanCheckResponse {
        user_id,
        permission_id: params.permission_id,
        banned,
    })
    .into_response())
}

/// DELETE /users/:user_id/bans/:permission_id
pub async fn unban_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path((user_id, permission_id)): Path<(String, String)>,
) -> ApiResult {
    let permission_id: PermissionId = dto::parse_id(&permission_id, "permission id")?;
    services
        .authz
        .bans
        .unban_user(&user_id, permission_id)
        .await
        .map_err(domain_error_to_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// GET /bans
pub async fn get_all_bans(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let bans = services
        .authz
        .bans
        .get_all_user_bans()
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(bans).into_response())
}

/// GET /bans/recent?days=&limit=
pub async fn get_recent_bans(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::RecentBansQuery>, QueryRejection>,
) -> ApiResult {
    let params = dto::query(params)?;
    let bans = services
        .authz
        .bans
        .get_recent_bans(params.days.unwrap_or(0), params.limit)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(bans).into_response())
}

/// GET /bans/:id
pub async fn get_ban(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: BanId = dto::parse_id(&id, "ban id")?;
    let detail = services
        .authz
        .bans
        .get_user_ban(id)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(detail).into_response())
}

/// PUT /bans/:id
pub async fn update_ban_reason(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateReasonRequest>, JsonRejection>,
) -> ApiResult {
    let id: BanId = dto::parse_id(&id, "ban id")?;
    let body = dto::body(payload)?;
    let ban = services
        .authz
        .bans
        .update_ban_reason(id, &body.reason)
        .await
        .map_err(domain_error_to_response)?;
    Ok(Json(ban).into_response())
}

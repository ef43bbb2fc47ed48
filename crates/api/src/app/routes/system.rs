use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use gatekeep_infra::health::{check_within, HealthCheck, CHECK_TIMEOUT};

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn ping() -> impl IntoResponse {
    Json(json!({
        "message": "pong",
        "status": "healthy",
    }))
}

/// GET /health/db
pub async fn db_health(Extension(services): Extension<Arc<AppServices>>) -> Response {
    probe(services.store_health.as_ref()).await
}

/// GET /health/redis (503 when Redis is not configured)
pub async fn redis_health(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match &services.liveness {
        Some(probe) => self::probe(probe.as_ref()).await,
        None => errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "not_configured",
            "redis is not configured",
        ),
    }
}

async fn probe(check: &dyn HealthCheck) -> Response {
    match check_within(check, CHECK_TIMEOUT).await {
        Ok(()) => Json(json!({
            "status": "healthy",
            "component": check.component(),
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(component = check.component(), error = %e, "health check failed");
            errors::json_error(StatusCode::SERVICE_UNAVAILABLE, "unhealthy", e.to_string())
        }
    }
}

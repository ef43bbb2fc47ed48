use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use gatekeep_core::Entity;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct BindPermissionRequest {
    pub permission_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct BanUserRequest {
    pub permission_id: i64,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReasonRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct BanCheckQuery {
    pub permission_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentBansQuery {
    pub days: Option<u32>,
    pub limit: Option<usize>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct BanCheckResponse {
    pub user_id: String,
    pub permission_id: i64,
    pub banned: bool,
}

// -------------------------
// Extraction helpers
// -------------------------

/// Parse a path identifier (`RoleId`, `PermissionId`, `BanId`).
pub fn parse_id<T>(raw: &str, what: &str) -> Result<T, Response>
where
    T: std::str::FromStr,
{
    raw.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what}: '{raw}'"),
        )
    })
}

pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.body_text()))
}

pub fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    params
        .map(|Query(v)| v)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", e.body_text()))
}

// -------------------------
// Response helpers
// -------------------------

/// 201 with the new record as body and its canonical URL in `Location`.
pub fn created<E>(collection: &str, entity: E) -> Response
where
    E: Entity + Serialize,
    E::Id: std::fmt::Display,
{
    let location = format!("/api/v1/{collection}/{}", entity.id());
    (StatusCode::CREATED, [(header::LOCATION, location)], Json(entity)).into_response()
}

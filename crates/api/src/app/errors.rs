use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use gatekeep_core::DomainError;

/// Handlers return the error response itself so `?` can short-circuit.
pub type ApiResult = Result<Response, Response>;

pub fn domain_error_to_response(err: DomainError) -> Response {
    let status = match &err {
        DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Unavailable(_) => {
            tracing::warn!(error = %err, "store unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

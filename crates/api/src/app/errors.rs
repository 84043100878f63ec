//! Consistent error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::app::dto;

pub fn json_error(
    status: StatusCode,
    message: &str,
    detail: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(dto::envelope(
            false,
            message,
            serde_json::json!({ "error": detail.into() }),
        )),
    )
        .into_response()
}

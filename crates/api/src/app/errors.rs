use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockflow_core::WorkflowError;

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    match err {
        WorkflowError::InsufficientStock { .. } => {
            json_error(StatusCode::CONFLICT, "insufficient_stock", err.to_string())
        }
        WorkflowError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        WorkflowError::InvalidState(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", msg)
        }
        WorkflowError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        WorkflowError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        WorkflowError::Persistence(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

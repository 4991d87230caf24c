use std::sync::Arc;

use axum::{
    extract::Extension, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};

use stockflow_auth::Identity;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new().route("/", get(report))
}

/// Full request history joined with product and requester names.
pub async fn report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&identity, "reports.read") {
        return resp;
    }

    match services.workflow.report().await {
        Ok(rows) => {
            let body: Vec<_> = rows.iter().map(dto::report_row_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::workflow_error_to_response(e),
    }
}

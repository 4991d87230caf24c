use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use stockflow_auth::Identity;
use stockflow_core::{ProductId, RequestId};
use stockflow_requests::RequestState;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_requests).post(submit_request))
        .route("/:id/approve", put(approve_request))
        .route("/:id/reject", put(reject_request))
}

pub async fn list_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<dto::ListRequestsQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&identity, "requests.read") {
        return resp;
    }

    let state: Option<RequestState> = match query.estado.as_deref() {
        None => None,
        Some(s) => match s.parse() {
            Ok(state) => Some(state),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_state",
                    format!("unknown estado '{s}'"),
                )
            }
        },
    };

    // Reviewers see every request; everyone else only their own.
    let result = if authz::allowed(&identity, "requests.review") {
        services.workflow.list_requests(state).await
    } else {
        services
            .workflow
            .list_requests_for_user(identity.user_id, state)
            .await
    };

    match result {
        Ok(requests) => {
            let body: Vec<_> = requests.iter().map(dto::request_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn submit_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<dto::SubmitRequestBody>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&identity, "requests.submit") {
        return resp;
    }

    let product_id: ProductId = match body.producto_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id")
        }
    };

    match services
        .workflow
        .submit(&identity, product_id, body.cantidad)
        .await
    {
        Ok(request) => (StatusCode::CREATED, Json(dto::request_to_json(&request))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn approve_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&identity, "requests.review") {
        return resp;
    }

    let id: RequestId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid request id")
        }
    };

    match services.workflow.approve(&identity, id).await {
        Ok(request) => (StatusCode::OK, Json(dto::request_to_json(&request))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn reject_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&identity, "requests.review") {
        return resp;
    }

    let id: RequestId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid request id")
        }
    };

    match services.workflow.reject(&identity, id).await {
        Ok(request) => (StatusCode::OK, Json(dto::request_to_json(&request))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

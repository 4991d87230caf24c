use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockflow_auth::{Identity, Role, UserAccount};
use stockflow_core::UserId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", axum::routing::put(update_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> axum::response::Response {
    // Administrators get the full directory; report readers only the
    // id/username pairs they need to label request listings.
    let full = authz::allowed(&identity, "users.manage");
    if !full {
        if let Err(resp) = authz::require(&identity, "reports.read") {
            return resp;
        }
    }

    match services.workflow.list_users().await {
        Ok(users) => {
            let body: Vec<_> = if full {
                users.iter().map(dto::user_to_json).collect()
            } else {
                users.iter().map(dto::user_summary_to_json).collect()
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUserBody>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&identity, "users.manage") {
        return resp;
    }

    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id")
        }
    };

    let role: Role = match body.role.parse() {
        Ok(role) => role,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_role",
                format!("unknown role '{}'", body.role),
            )
        }
    };

    let user = match UserAccount::new(id, body.username, body.email, role) {
        Ok(user) => user,
        Err(e) => return errors::workflow_error_to_response(e),
    };

    match services.workflow.update_user(&identity, user).await {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&identity, "users.manage") {
        return resp;
    }

    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id")
        }
    };

    match services.workflow.delete_user(&identity, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

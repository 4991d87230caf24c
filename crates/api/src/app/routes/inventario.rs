use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockflow_auth::Identity;
use stockflow_core::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", axum::routing::put(update_product).delete(delete_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&identity, "inventory.read") {
        return resp;
    }

    match services.workflow.list_products().await {
        Ok(products) => {
            let body: Vec<_> = products.iter().map(dto::product_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<dto::CreateProductBody>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&identity, "inventory.manage") {
        return resp;
    }

    match services
        .workflow
        .create_product(&identity, body.nombre, body.cantidad)
        .await
    {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateProductBody>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&identity, "inventory.manage") {
        return resp;
    }

    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id")
        }
    };

    match services
        .workflow
        .update_product(&identity, id, body.nombre, body.cantidad)
        .await
    {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&identity, "inventory.manage") {
        return resp;
    }

    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id")
        }
    };

    match services.workflow.delete_product(&identity, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

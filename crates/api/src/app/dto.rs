//! Request/response DTOs and JSON mapping helpers.
//!
//! The wire shape keeps the field names the existing clients use
//! (`nombre`, `cantidad`, `estado`, ...); Rust types stay English.

use serde::Deserialize;
use serde_json::json;

use stockflow_auth::UserAccount;
use stockflow_infra::ReportRow;
use stockflow_inventory::Product;
use stockflow_requests::WithdrawalRequest;

#[derive(Debug, Deserialize)]
pub struct CreateProductBody {
    pub nombre: String,
    pub cantidad: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductBody {
    pub nombre: Option<String>,
    pub cantidad: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequestBody {
    pub producto_id: String,
    pub cantidad: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub estado: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    pub username: String,
    pub email: String,
    pub role: String,
}

pub fn product_to_json(product: &Product) -> serde_json::Value {
    json!({
        "id": product.id.to_string(),
        "nombre": product.name,
        "cantidad": product.quantity,
    })
}

pub fn request_to_json(request: &WithdrawalRequest) -> serde_json::Value {
    json!({
        "id": request.id.to_string(),
        "producto_id": request.product_id.to_string(),
        "usuario_id": request.user_id.to_string(),
        "cantidad": request.quantity,
        "estado": request.state.as_str(),
        "fecha_solicitud": request.created_at.to_rfc3339(),
        "fecha_decision": request.decided_at.map(|t| t.to_rfc3339()),
    })
}

pub fn user_to_json(user: &UserAccount) -> serde_json::Value {
    json!({
        "id": user.id.to_string(),
        "username": user.username,
        "email": user.email,
        "role": user.role.as_str(),
    })
}

/// Reduced projection for callers that may only join names onto listings.
pub fn user_summary_to_json(user: &UserAccount) -> serde_json::Value {
    json!({
        "id": user.id.to_string(),
        "username": user.username,
    })
}

pub fn report_row_to_json(row: &ReportRow) -> serde_json::Value {
    json!({
        "id": row.request_id.to_string(),
        "producto_id": row.product_id.to_string(),
        "producto_nombre": row.product_name,
        "usuario_id": row.user_id.to_string(),
        "usuario": row.username,
        "cantidad": row.quantity,
        "estado": row.state.as_str(),
        "fecha_solicitud": row.created_at.to_rfc3339(),
        "fecha_decision": row.decided_at.map(|t| t.to_rfc3339()),
    })
}

use axum::http::StatusCode;
use axum::response::Response;

use stockflow_auth::{authorize, Identity, Permission};

use crate::app::errors;

/// Boundary capability check: handlers call this once before touching the
/// workflow service. Returns a ready-made 403 response on denial.
pub fn require(identity: &Identity, permission: &'static str) -> Result<(), Response> {
    authorize(identity, &Permission::new(permission))
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}

/// Non-failing variant for scope decisions (e.g. "may this caller see all
/// requests or only their own?").
pub fn allowed(identity: &Identity, permission: &'static str) -> bool {
    authorize(identity, &Permission::new(permission)).is_ok()
}

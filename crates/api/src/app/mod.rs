//! HTTP application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: infrastructure wiring (store, notifier, workflow service)
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(jwt_secret: String, services: Arc<AppServices>) -> Router {
    let jwt = Arc::new(stockflow_auth::Hs256JwtValidator::new(
        jwt_secret.into_bytes(),
    ));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}

use axum::Router;

pub mod informes;
pub mod inventario;
pub mod solicitudes;
pub mod system;
pub mod usuarios;

/// All protected routes (everything except `/health`).
pub fn router() -> Router {
    Router::new()
        .nest("/inventario", inventario::router())
        .nest("/solicitudes", solicitudes::router())
        .nest("/usuarios", usuarios::router())
        .nest("/informes", informes::router())
}

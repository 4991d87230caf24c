use std::sync::Arc;

use anyhow::Context;

use stockflow_api::app::{self, AppServices};
use stockflow_infra::{InMemoryStore, LogNotifier, PostgresStore, WorkflowStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockflow_observability::init();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let store: Arc<dyn WorkflowStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PostgresStore::connect(&url)
                .await
                .map_err(|e| anyhow::anyhow!("failed to connect to database: {e}"))?;
            tracing::info!("using postgres store");
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using volatile in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let services = Arc::new(AppServices::new(store, Arc::new(LogNotifier::new())));
    let app = app::build_app(jwt_secret, services);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:4000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

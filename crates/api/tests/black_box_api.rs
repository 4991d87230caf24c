use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use stockflow_api::app::{build_app, AppServices};
use stockflow_auth::{JwtClaims, Role, UserAccount};
use stockflow_core::UserId;
use stockflow_infra::{InMemoryStore, LogNotifier, WorkflowStore};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    admin_token: String,
    user_token: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Build the prod router over a seeded in-memory store and bind it to an
    /// ephemeral port.
    async fn spawn() -> Self {
        let store = Arc::new(InMemoryStore::new());

        let admin_id = UserId::new();
        let user_id = UserId::new();
        store
            .upsert_user(
                UserAccount::new(admin_id, "marta", "marta@example.com", Role::Admin).unwrap(),
            )
            .await
            .unwrap();
        store
            .upsert_user(
                UserAccount::new(user_id, "pedro", "pedro@example.com", Role::User).unwrap(),
            )
            .await
            .unwrap();

        let services = Arc::new(AppServices::new(store, Arc::new(LogNotifier::new())));
        let app = build_app(JWT_SECRET.to_string(), services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            admin_token: mint_jwt(admin_id, "marta", vec![Role::Admin]),
            user_token: mint_jwt(user_id, "pedro", vec![Role::User]),
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: UserId, username: &str, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        username: username.to_string(),
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn create_product(
    client: &reqwest::Client,
    srv: &TestServer,
    nombre: &str,
    cantidad: i64,
) -> String {
    let res = client
        .post(format!("{}/inventario", srv.base_url))
        .bearer_auth(&srv.admin_token)
        .json(&json!({ "nombre": nombre, "cantidad": cantidad }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn product_quantity(client: &reqwest::Client, srv: &TestServer, id: &str) -> i64 {
    let res = client
        .get(format!("{}/inventario", srv.base_url))
        .bearer_auth(&srv.user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body.as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == id)
        .map(|p| p["cantidad"].as_i64().unwrap())
        .expect("product not in listing")
}

#[tokio::test]
async fn health_is_open_but_everything_else_requires_auth() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    for path in ["/inventario", "/solicitudes", "/usuarios", "/informes"] {
        let res = client
            .get(format!("{}{}", srv.base_url, path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "path {path}");
    }
}

#[tokio::test]
async fn plain_users_cannot_manage_inventory_or_review_requests() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/inventario", srv.base_url))
        .bearer_auth(&srv.user_token)
        .json(&json!({ "nombre": "cilindro", "cantidad": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let product_id = create_product(&client, &srv, "cilindro", 5).await;
    let res = client
        .post(format!("{}/solicitudes", srv.base_url))
        .bearer_auth(&srv.user_token)
        .json(&json!({ "producto_id": product_id, "cantidad": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let request: serde_json::Value = res.json().await.unwrap();

    let res = client
        .put(format!(
            "{}/solicitudes/{}/approve",
            srv.base_url,
            request["id"].as_str().unwrap()
        ))
        .bearer_auth(&srv.user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn submit_approve_round_trip() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let product_id = create_product(&client, &srv, "cilindro 20lb", 10).await;

    let res = client
        .post(format!("{}/solicitudes", srv.base_url))
        .bearer_auth(&srv.user_token)
        .json(&json!({ "producto_id": product_id, "cantidad": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let request: serde_json::Value = res.json().await.unwrap();
    assert_eq!(request["estado"], "pendiente");
    let request_id = request["id"].as_str().unwrap().to_string();

    // Stock was reserved at submission.
    assert_eq!(product_quantity(&client, &srv, &product_id).await, 6);

    let res = client
        .put(format!("{}/solicitudes/{}/approve", srv.base_url, request_id))
        .bearer_auth(&srv.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let decided: serde_json::Value = res.json().await.unwrap();
    assert_eq!(decided["estado"], "aprobada");

    // Approval keeps the reservation.
    assert_eq!(product_quantity(&client, &srv, &product_id).await, 6);

    // Terminal requests cannot be re-decided.
    let res = client
        .put(format!("{}/solicitudes/{}/reject", srv.base_url, request_id))
        .bearer_auth(&srv.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // The report joins product and requester names.
    let res = client
        .get(format!("{}/informes", srv.base_url))
        .bearer_auth(&srv.user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rows: serde_json::Value = res.json().await.unwrap();
    let row = &rows.as_array().unwrap()[0];
    assert_eq!(row["producto_nombre"], "cilindro 20lb");
    assert_eq!(row["usuario"], "pedro");
    assert_eq!(row["estado"], "aprobada");
}

#[tokio::test]
async fn reject_returns_the_reserved_stock() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let product_id = create_product(&client, &srv, "regulador", 10).await;

    let res = client
        .post(format!("{}/solicitudes", srv.base_url))
        .bearer_auth(&srv.user_token)
        .json(&json!({ "producto_id": product_id, "cantidad": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let request: serde_json::Value = res.json().await.unwrap();
    assert_eq!(product_quantity(&client, &srv, &product_id).await, 6);

    let res = client
        .put(format!(
            "{}/solicitudes/{}/reject",
            srv.base_url,
            request["id"].as_str().unwrap()
        ))
        .bearer_auth(&srv.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(product_quantity(&client, &srv, &product_id).await, 10);
}

#[tokio::test]
async fn over_stock_submission_is_rejected_and_changes_nothing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let product_id = create_product(&client, &srv, "manguera", 10).await;

    let res = client
        .post(format!("{}/solicitudes", srv.base_url))
        .bearer_auth(&srv.user_token)
        .json(&json!({ "producto_id": product_id, "cantidad": 20 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");

    assert_eq!(product_quantity(&client, &srv, &product_id).await, 10);

    // No request row was created.
    let res = client
        .get(format!("{}/solicitudes", srv.base_url))
        .bearer_auth(&srv.admin_token)
        .send()
        .await
        .unwrap();
    let requests: serde_json::Value = res.json().await.unwrap();
    assert!(requests.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn request_listing_is_scoped_and_filterable() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let product_id = create_product(&client, &srv, "valvula", 10).await;

    // The admin submits one too; the plain user must not see it.
    for token in [&srv.user_token, &srv.admin_token] {
        let res = client
            .post(format!("{}/solicitudes", srv.base_url))
            .bearer_auth(token)
            .json(&json!({ "producto_id": product_id, "cantidad": 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .get(format!("{}/solicitudes", srv.base_url))
        .bearer_auth(&srv.user_token)
        .send()
        .await
        .unwrap();
    let own: serde_json::Value = res.json().await.unwrap();
    assert_eq!(own.as_array().unwrap().len(), 1);

    let res = client
        .get(format!("{}/solicitudes?estado=pendiente", srv.base_url))
        .bearer_auth(&srv.admin_token)
        .send()
        .await
        .unwrap();
    let all: serde_json::Value = res.json().await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);

    let res = client
        .get(format!("{}/solicitudes?estado=nada", srv.base_url))
        .bearer_auth(&srv.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_directory_is_tiered_by_capability() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/usuarios", srv.base_url))
        .bearer_auth(&srv.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let full: serde_json::Value = res.json().await.unwrap();
    assert!(full.as_array().unwrap().iter().all(|u| u.get("email").is_some()));

    let res = client
        .get(format!("{}/usuarios", srv.base_url))
        .bearer_auth(&srv.user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let summaries: serde_json::Value = res.json().await.unwrap();
    assert!(summaries
        .as_array()
        .unwrap()
        .iter()
        .all(|u| u.get("email").is_none() && u.get("username").is_some()));
}

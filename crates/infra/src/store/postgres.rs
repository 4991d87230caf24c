//! Postgres-backed workflow store.
//!
//! Workflow commits run inside a transaction. Product rows carry a `version`
//! column and are updated conditionally (`WHERE id = $n AND version = $m`);
//! request state flips are guarded (`WHERE id = $n AND estado = 'pendiente'`).
//! Zero affected rows means another writer won the race: the transaction is
//! rolled back and the caller sees `Conflict`.
//!
//! SQLx errors map to `StoreError` as follows: unique violations (`23505`)
//! and foreign-key violations (`23503`) become `Conflict`; everything else
//! becomes `Backend` and is surfaced verbatim.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use stockflow_auth::{Role, UserAccount};
use stockflow_core::{ProductId, RequestId, UserId};
use stockflow_inventory::Product;
use stockflow_requests::{RequestState, WithdrawalRequest};

use super::{ReportRow, StoreError, WorkflowStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS inventario (
    id UUID PRIMARY KEY,
    nombre TEXT NOT NULL,
    cantidad BIGINT NOT NULL CHECK (cantidad >= 0),
    version BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS usuarios (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL,
    email TEXT NOT NULL,
    role TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS solicitudes (
    id UUID PRIMARY KEY,
    producto_id UUID NOT NULL REFERENCES inventario(id),
    usuario_id UUID NOT NULL,
    cantidad BIGINT NOT NULL CHECK (cantidad > 0),
    estado TEXT NOT NULL,
    fecha_solicitud TIMESTAMPTZ NOT NULL,
    fecha_decision TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS solicitudes_estado_idx ON solicitudes (estado);
CREATE INDEX IF NOT EXISTS solicitudes_usuario_idx ON solicitudes (usuario_id);
"#;

/// Postgres-backed store. `PgPool` is cheap to clone and thread-safe.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

fn map_sqlx_error(op: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if let Some(code) = db.code() {
            if code == "23505" {
                return StoreError::Conflict(format!("{op}: unique violation"));
            }
            if code == "23503" {
                return StoreError::Conflict(format!("{op}: referenced by other rows"));
            }
        }
    }
    StoreError::Backend(format!("{op}: {e}"))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let version: i64 = row
        .try_get("version")
        .map_err(|e| StoreError::Backend(format!("product row: {e}")))?;
    Ok(Product {
        id: ProductId::from_uuid(
            row.try_get::<Uuid, _>("id")
                .map_err(|e| StoreError::Backend(format!("product row: {e}")))?,
        ),
        name: row
            .try_get("nombre")
            .map_err(|e| StoreError::Backend(format!("product row: {e}")))?,
        quantity: row
            .try_get("cantidad")
            .map_err(|e| StoreError::Backend(format!("product row: {e}")))?,
        version: version as u64,
    })
}

fn request_from_row(row: &PgRow) -> Result<WithdrawalRequest, StoreError> {
    let estado: String = row
        .try_get("estado")
        .map_err(|e| StoreError::Backend(format!("request row: {e}")))?;
    let state: RequestState = estado
        .parse()
        .map_err(|_| StoreError::Backend(format!("request row: unknown estado '{estado}'")))?;

    Ok(WithdrawalRequest {
        id: RequestId::from_uuid(
            row.try_get::<Uuid, _>("id")
                .map_err(|e| StoreError::Backend(format!("request row: {e}")))?,
        ),
        product_id: ProductId::from_uuid(
            row.try_get::<Uuid, _>("producto_id")
                .map_err(|e| StoreError::Backend(format!("request row: {e}")))?,
        ),
        user_id: UserId::from_uuid(
            row.try_get::<Uuid, _>("usuario_id")
                .map_err(|e| StoreError::Backend(format!("request row: {e}")))?,
        ),
        quantity: row
            .try_get("cantidad")
            .map_err(|e| StoreError::Backend(format!("request row: {e}")))?,
        state,
        created_at: row
            .try_get::<DateTime<Utc>, _>("fecha_solicitud")
            .map_err(|e| StoreError::Backend(format!("request row: {e}")))?,
        decided_at: row
            .try_get::<Option<DateTime<Utc>>, _>("fecha_decision")
            .map_err(|e| StoreError::Backend(format!("request row: {e}")))?,
    })
}

fn user_from_row(row: &PgRow) -> Result<UserAccount, StoreError> {
    let role: String = row
        .try_get("role")
        .map_err(|e| StoreError::Backend(format!("user row: {e}")))?;
    let role: Role = role
        .parse()
        .map_err(|_| StoreError::Backend(format!("user row: unknown role '{role}'")))?;

    Ok(UserAccount {
        id: UserId::from_uuid(
            row.try_get::<Uuid, _>("id")
                .map_err(|e| StoreError::Backend(format!("user row: {e}")))?,
        ),
        username: row
            .try_get("username")
            .map_err(|e| StoreError::Backend(format!("user row: {e}")))?,
        email: row
            .try_get("email")
            .map_err(|e| StoreError::Backend(format!("user row: {e}")))?,
        role,
    })
}

#[async_trait]
impl WorkflowStore for PostgresStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT id, nombre, cantidad, version FROM inventario WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows =
            sqlx::query("SELECT id, nombre, cantidad, version FROM inventario ORDER BY nombre")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO inventario (id, nombre, cantidad, version) VALUES ($1, $2, $3, $4)")
            .bind(product.id.as_uuid())
            .bind(&product.name)
            .bind(product.quantity)
            .bind(product.version as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn update_product(
        &self,
        product: Product,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE inventario SET nombre = $1, cantidad = $2, version = $3 \
             WHERE id = $4 AND version = $5",
        )
        .bind(&product.name)
        .bind(product.quantity)
        .bind((expected_version + 1) as i64)
        .bind(product.id.as_uuid())
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(
                "product version is stale or product is gone".to_string(),
            ));
        }
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM inventario WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn request(&self, id: RequestId) -> Result<Option<WithdrawalRequest>, StoreError> {
        let row = sqlx::query(
            "SELECT id, producto_id, usuario_id, cantidad, estado, fecha_solicitud, fecha_decision \
             FROM solicitudes WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("request", e))?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn list_requests(
        &self,
        state: Option<RequestState>,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let rows = match state {
            Some(state) => sqlx::query(
                "SELECT id, producto_id, usuario_id, cantidad, estado, fecha_solicitud, fecha_decision \
                 FROM solicitudes WHERE estado = $1 ORDER BY fecha_solicitud",
            )
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query(
                "SELECT id, producto_id, usuario_id, cantidad, estado, fecha_solicitud, fecha_decision \
                 FROM solicitudes ORDER BY fecha_solicitud",
            )
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| map_sqlx_error("list_requests", e))?;

        rows.iter().map(request_from_row).collect()
    }

    async fn list_requests_for_user(
        &self,
        user_id: UserId,
        state: Option<RequestState>,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let rows = match state {
            Some(state) => sqlx::query(
                "SELECT id, producto_id, usuario_id, cantidad, estado, fecha_solicitud, fecha_decision \
                 FROM solicitudes WHERE usuario_id = $1 AND estado = $2 ORDER BY fecha_solicitud",
            )
            .bind(user_id.as_uuid())
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query(
                "SELECT id, producto_id, usuario_id, cantidad, estado, fecha_solicitud, fecha_decision \
                 FROM solicitudes WHERE usuario_id = $1 ORDER BY fecha_solicitud",
            )
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| map_sqlx_error("list_requests_for_user", e))?;

        rows.iter().map(request_from_row).collect()
    }

    async fn commit_submission(
        &self,
        product: Product,
        expected_version: u64,
        request: WithdrawalRequest,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("commit_submission", e))?;

        let result = sqlx::query(
            "UPDATE inventario SET cantidad = $1, version = $2 WHERE id = $3 AND version = $4",
        )
        .bind(product.quantity)
        .bind((expected_version + 1) as i64)
        .bind(product.id.as_uuid())
        .bind(expected_version as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("commit_submission", e))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("commit_submission", e))?;
            return Err(StoreError::Conflict(
                "product version is stale or product is gone".to_string(),
            ));
        }

        sqlx::query(
            "INSERT INTO solicitudes (id, producto_id, usuario_id, cantidad, estado, fecha_solicitud) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(request.id.as_uuid())
        .bind(request.product_id.as_uuid())
        .bind(request.user_id.as_uuid())
        .bind(request.quantity)
        .bind(request.state.as_str())
        .bind(request.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("commit_submission", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_submission", e))
    }

    async fn commit_decision(
        &self,
        request: WithdrawalRequest,
        product_update: Option<(Product, u64)>,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("commit_decision", e))?;

        let result = sqlx::query(
            "UPDATE solicitudes SET estado = $1, fecha_decision = $2 \
             WHERE id = $3 AND estado = 'pendiente'",
        )
        .bind(request.state.as_str())
        .bind(request.decided_at)
        .bind(request.id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("commit_decision", e))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("commit_decision", e))?;
            return Err(StoreError::Conflict(
                "request is gone or no longer pending".to_string(),
            ));
        }

        if let Some((product, expected_version)) = product_update {
            let result = sqlx::query(
                "UPDATE inventario SET cantidad = $1, version = $2 WHERE id = $3 AND version = $4",
            )
            .bind(product.quantity)
            .bind((expected_version + 1) as i64)
            .bind(product.id.as_uuid())
            .bind(expected_version as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("commit_decision", e))?;

            if result.rows_affected() == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("commit_decision", e))?;
                return Err(StoreError::Conflict(
                    "product version is stale or product is gone".to_string(),
                ));
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_decision", e))
    }

    async fn user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query("SELECT id, username, email, role FROM usuarios WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError> {
        let rows = sqlx::query("SELECT id, username, email, role FROM usuarios ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter().map(user_from_row).collect()
    }

    async fn upsert_user(&self, user: UserAccount) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO usuarios (id, username, email, role) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET username = $2, email = $3, role = $4",
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_user", e))?;
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM usuarios WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn report_rows(&self) -> Result<Vec<ReportRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT s.id, s.producto_id, i.nombre AS producto_nombre, s.usuario_id, \
                    COALESCE(u.username, 'unknown') AS username, s.cantidad, s.estado, \
                    s.fecha_solicitud, s.fecha_decision \
             FROM solicitudes s \
             JOIN inventario i ON i.id = s.producto_id \
             LEFT JOIN usuarios u ON u.id = s.usuario_id \
             ORDER BY s.fecha_solicitud DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("report_rows", e))?;

        rows.iter()
            .map(|row| {
                let estado: String = row
                    .try_get("estado")
                    .map_err(|e| StoreError::Backend(format!("report row: {e}")))?;
                let state: RequestState = estado.parse().map_err(|_| {
                    StoreError::Backend(format!("report row: unknown estado '{estado}'"))
                })?;

                Ok(ReportRow {
                    request_id: RequestId::from_uuid(
                        row.try_get::<Uuid, _>("id")
                            .map_err(|e| StoreError::Backend(format!("report row: {e}")))?,
                    ),
                    product_id: ProductId::from_uuid(
                        row.try_get::<Uuid, _>("producto_id")
                            .map_err(|e| StoreError::Backend(format!("report row: {e}")))?,
                    ),
                    product_name: row
                        .try_get("producto_nombre")
                        .map_err(|e| StoreError::Backend(format!("report row: {e}")))?,
                    user_id: UserId::from_uuid(
                        row.try_get::<Uuid, _>("usuario_id")
                            .map_err(|e| StoreError::Backend(format!("report row: {e}")))?,
                    ),
                    username: row
                        .try_get("username")
                        .map_err(|e| StoreError::Backend(format!("report row: {e}")))?,
                    quantity: row
                        .try_get("cantidad")
                        .map_err(|e| StoreError::Backend(format!("report row: {e}")))?,
                    state,
                    created_at: row
                        .try_get::<DateTime<Utc>, _>("fecha_solicitud")
                        .map_err(|e| StoreError::Backend(format!("report row: {e}")))?,
                    decided_at: row
                        .try_get::<Option<DateTime<Utc>>, _>("fecha_decision")
                        .map_err(|e| StoreError::Backend(format!("report row: {e}")))?,
                })
            })
            .collect()
    }
}

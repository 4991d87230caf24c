//! Transactional storage boundary for the withdrawal workflow.
//!
//! The store is the only mutable shared resource. Workflow transitions that
//! touch both a product row and a request row (`commit_submission`,
//! `commit_decision`) are committed as single transactions; product updates
//! are conditional on an expected version so a stale read-modify-write
//! surfaces as [`StoreError::Conflict`] instead of over-drawing stock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use stockflow_auth::UserAccount;
use stockflow_core::{ProductId, RequestId, UserId, WorkflowError};
use stockflow_inventory::Product;
use stockflow_requests::{RequestState, WithdrawalRequest};

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// An optimistic concurrency check failed (stale version or a request
    /// that is no longer pending). The caller may re-read and retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The addressed row does not exist.
    #[error("not found")]
    NotFound,

    /// The storage backend failed. Any partial mutation was rolled back.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => WorkflowError::Conflict(msg),
            StoreError::NotFound => WorkflowError::NotFound,
            StoreError::Backend(msg) => WorkflowError::Persistence(msg),
        }
    }
}

/// A request row joined with product and requester names, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub request_id: RequestId,
    pub product_id: ProductId,
    pub product_name: String,
    pub user_id: UserId,
    pub username: String,
    pub quantity: i64,
    pub state: RequestState,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// Storage contract for products, requests and the user directory.
///
/// Reads return current rows (products carry their version stamp). Writes
/// that participate in the workflow are atomic commits with explicit
/// preconditions; everything else is plain CRUD.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    // ── products ────────────────────────────────────────────────────────

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn insert_product(&self, product: Product) -> Result<(), StoreError>;

    /// Conditional update: fails with `Conflict` unless the stored version
    /// equals `expected_version`. The committed row gets version + 1.
    async fn update_product(
        &self,
        product: Product,
        expected_version: u64,
    ) -> Result<(), StoreError>;

    /// Fails with `Conflict` while withdrawal requests still reference the
    /// product (the audit trail is append-only).
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;

    // ── requests ────────────────────────────────────────────────────────

    async fn request(&self, id: RequestId) -> Result<Option<WithdrawalRequest>, StoreError>;

    async fn list_requests(
        &self,
        state: Option<RequestState>,
    ) -> Result<Vec<WithdrawalRequest>, StoreError>;

    async fn list_requests_for_user(
        &self,
        user_id: UserId,
        state: Option<RequestState>,
    ) -> Result<Vec<WithdrawalRequest>, StoreError>;

    // ── workflow commits ────────────────────────────────────────────────

    /// One transaction: conditional product update (the reservation) plus
    /// the insert of the pending request. Neither lands without the other.
    async fn commit_submission(
        &self,
        product: Product,
        expected_version: u64,
        request: WithdrawalRequest,
    ) -> Result<(), StoreError>;

    /// One transaction: flip the request out of `Pending` (guarded — a row
    /// that is no longer pending yields `Conflict`) and, when rejecting,
    /// apply the conditional product update returning the reserved stock.
    async fn commit_decision(
        &self,
        request: WithdrawalRequest,
        product_update: Option<(Product, u64)>,
    ) -> Result<(), StoreError>;

    // ── user directory ──────────────────────────────────────────────────

    async fn user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError>;

    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError>;

    async fn upsert_user(&self, user: UserAccount) -> Result<(), StoreError>;

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError>;

    // ── reporting ───────────────────────────────────────────────────────

    async fn report_rows(&self) -> Result<Vec<ReportRow>, StoreError>;
}

//! The withdrawal workflow service.
//!
//! Composes the pure domain rules with the transactional store: every
//! operation is a read-decide-commit cycle. Commits are conditional on the
//! versions read, so a lost race surfaces as a store conflict and the whole
//! cycle is retried from a fresh read. State checks run before any ledger
//! mutation; a storage failure commits neither side of a transition.

use std::sync::Arc;

use chrono::Utc;

use stockflow_auth::{Identity, UserAccount};
use stockflow_core::{ProductId, RequestId, WorkflowError, WorkflowResult};
use stockflow_inventory::Product;
use stockflow_requests::{RequestState, WithdrawalRequest};

use crate::notify::{Notifier, Outcome, Receipt};
use crate::store::{ReportRow, WorkflowStore};

/// Upper bound on optimistic retries for a single operation. Each retry
/// re-reads current rows, so contention resolves quickly; hitting the bound
/// surfaces the conflict to the caller instead of spinning.
const MAX_COMMIT_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Approve,
    Reject,
}

pub struct WithdrawalService {
    store: Arc<dyn WorkflowStore>,
    notifier: Arc<dyn Notifier>,
}

impl WithdrawalService {
    pub fn new(store: Arc<dyn WorkflowStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    // ── workflow operations ─────────────────────────────────────────────

    /// Submit a withdrawal request, reserving stock in the same transaction
    /// that persists the pending request.
    ///
    /// On `InsufficientStock` no request row is ever written and the ledger
    /// is untouched.
    pub async fn submit(
        &self,
        identity: &Identity,
        product_id: ProductId,
        quantity: i64,
    ) -> WorkflowResult<WithdrawalRequest> {
        for _attempt in 0..MAX_COMMIT_ATTEMPTS {
            let mut product = self
                .store
                .product(product_id)
                .await?
                .ok_or(WorkflowError::NotFound)?;
            let expected_version = product.version;

            product.reserve(quantity)?;
            let request = WithdrawalRequest::submit(
                RequestId::new(),
                identity.user_id,
                product_id,
                quantity,
                Utc::now(),
            )?;

            match self
                .store
                .commit_submission(product, expected_version, request.clone())
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        request_id = %request.id,
                        product_id = %product_id,
                        user_id = %identity.user_id,
                        quantity,
                        "withdrawal request submitted"
                    );
                    return Ok(request);
                }
                Err(crate::store::StoreError::Conflict(msg)) => {
                    tracing::debug!(product_id = %product_id, %msg, "submission conflicted, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(WorkflowError::conflict(
            "submission kept conflicting with concurrent writers",
        ))
    }

    /// Approve a pending request. The reservation stands; no ledger effect.
    pub async fn approve(
        &self,
        identity: &Identity,
        request_id: RequestId,
    ) -> WorkflowResult<WithdrawalRequest> {
        self.decide(identity, request_id, Decision::Approve).await
    }

    /// Reject a pending request, returning the reserved stock to the ledger
    /// in the same transaction as the state flip.
    pub async fn reject(
        &self,
        identity: &Identity,
        request_id: RequestId,
    ) -> WorkflowResult<WithdrawalRequest> {
        self.decide(identity, request_id, Decision::Reject).await
    }

    async fn decide(
        &self,
        identity: &Identity,
        request_id: RequestId,
        decision: Decision,
    ) -> WorkflowResult<WithdrawalRequest> {
        for _attempt in 0..MAX_COMMIT_ATTEMPTS {
            let mut request = self
                .store
                .request(request_id)
                .await?
                .ok_or(WorkflowError::NotFound)?;

            // State check first: a terminal request must fail here, before
            // any ledger read or mutation (no double-release).
            let now = Utc::now();
            let product_update = match decision {
                Decision::Approve => {
                    request.approve(now)?;
                    None
                }
                Decision::Reject => {
                    request.reject(now)?;
                    let mut product = self
                        .store
                        .product(request.product_id)
                        .await?
                        .ok_or_else(|| {
                            WorkflowError::persistence(
                                "request references a product that no longer exists",
                            )
                        })?;
                    let expected_version = product.version;
                    product.release(request.quantity)?;
                    Some((product, expected_version))
                }
            };

            match self
                .store
                .commit_decision(request.clone(), product_update)
                .await
            {
                Ok(()) => {
                    let outcome = match decision {
                        Decision::Approve => Outcome::Approved,
                        Decision::Reject => Outcome::Rejected,
                    };
                    tracing::info!(
                        request_id = %request.id,
                        decided_by = %identity.user_id,
                        outcome = %outcome,
                        "withdrawal request decided"
                    );
                    self.send_receipt(&request, outcome).await;
                    return Ok(request);
                }
                Err(crate::store::StoreError::Conflict(msg)) => {
                    tracing::debug!(request_id = %request_id, %msg, "decision conflicted, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(WorkflowError::conflict(
            "decision kept conflicting with concurrent writers",
        ))
    }

    /// Best-effort receipt delivery. Lookup or delivery failures are logged
    /// and never propagate into the transition's result.
    async fn send_receipt(&self, request: &WithdrawalRequest, outcome: Outcome) {
        let user = match self.store.user(request.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(user_id = %request.user_id, "requester not in directory, skipping receipt");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load requester, skipping receipt");
                return;
            }
        };
        let product_name = match self.store.product(request.product_id).await {
            Ok(Some(product)) => product.name,
            Ok(None) | Err(_) => "unknown".to_string(),
        };

        let receipt = Receipt {
            recipient: user.email,
            username: user.username,
            product_name,
            quantity: request.quantity,
            outcome,
        };
        if let Err(e) = self.notifier.notify(&receipt).await {
            tracing::warn!(error = %e, request_id = %request.id, "failed to deliver receipt");
        }
    }

    // ── ledger reads & administrative overrides ─────────────────────────

    pub async fn product(&self, id: ProductId) -> WorkflowResult<Product> {
        Ok(self.store.product(id).await?.ok_or(WorkflowError::NotFound)?)
    }

    pub async fn list_products(&self) -> WorkflowResult<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    pub async fn create_product(
        &self,
        identity: &Identity,
        name: String,
        quantity: i64,
    ) -> WorkflowResult<Product> {
        let product = Product::new(ProductId::new(), name, quantity)?;
        self.store.insert_product(product.clone()).await?;
        tracing::info!(product_id = %product.id, created_by = %identity.user_id, "product created");
        Ok(product)
    }

    /// Direct administrative edit, unconstrained by the request workflow.
    pub async fn update_product(
        &self,
        identity: &Identity,
        id: ProductId,
        name: Option<String>,
        quantity: Option<i64>,
    ) -> WorkflowResult<Product> {
        for _attempt in 0..MAX_COMMIT_ATTEMPTS {
            let mut product = self.store.product(id).await?.ok_or(WorkflowError::NotFound)?;
            let expected_version = product.version;

            if let Some(name) = name.clone() {
                product.rename(name)?;
            }
            if let Some(quantity) = quantity {
                product.set_quantity(quantity)?;
            }

            match self
                .store
                .update_product(product.clone(), expected_version)
                .await
            {
                Ok(()) => {
                    product.version = expected_version + 1;
                    tracing::info!(product_id = %id, edited_by = %identity.user_id, "product updated");
                    return Ok(product);
                }
                Err(crate::store::StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(WorkflowError::conflict(
            "product edit kept conflicting with concurrent writers",
        ))
    }

    pub async fn delete_product(&self, identity: &Identity, id: ProductId) -> WorkflowResult<()> {
        self.store.delete_product(id).await?;
        tracing::info!(product_id = %id, deleted_by = %identity.user_id, "product deleted");
        Ok(())
    }

    // ── request reads ───────────────────────────────────────────────────

    pub async fn list_requests(
        &self,
        state: Option<RequestState>,
    ) -> WorkflowResult<Vec<WithdrawalRequest>> {
        Ok(self.store.list_requests(state).await?)
    }

    pub async fn list_requests_for_user(
        &self,
        user_id: stockflow_core::UserId,
        state: Option<RequestState>,
    ) -> WorkflowResult<Vec<WithdrawalRequest>> {
        Ok(self.store.list_requests_for_user(user_id, state).await?)
    }

    // ── user directory ──────────────────────────────────────────────────

    pub async fn list_users(&self) -> WorkflowResult<Vec<UserAccount>> {
        Ok(self.store.list_users().await?)
    }

    pub async fn update_user(
        &self,
        identity: &Identity,
        user: UserAccount,
    ) -> WorkflowResult<UserAccount> {
        self.store.upsert_user(user.clone()).await?;
        tracing::info!(user_id = %user.id, edited_by = %identity.user_id, "user updated");
        Ok(user)
    }

    pub async fn delete_user(
        &self,
        identity: &Identity,
        id: stockflow_core::UserId,
    ) -> WorkflowResult<()> {
        self.store.delete_user(id).await?;
        tracing::info!(user_id = %id, deleted_by = %identity.user_id, "user deleted");
        Ok(())
    }

    // ── reporting ───────────────────────────────────────────────────────

    pub async fn report(&self) -> WorkflowResult<Vec<ReportRow>> {
        Ok(self.store.report_rows().await?)
    }
}

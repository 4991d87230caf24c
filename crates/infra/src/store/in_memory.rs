use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use stockflow_auth::UserAccount;
use stockflow_core::{ProductId, RequestId, UserId};
use stockflow_inventory::Product;
use stockflow_requests::{RequestState, WithdrawalRequest};

use super::{ReportRow, StoreError, WorkflowStore};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    requests: HashMap<RequestId, WithdrawalRequest>,
    users: HashMap<UserId, UserAccount>,
}

/// In-memory store for tests and the dev profile.
///
/// Every commit holds the table lock for the whole check-and-apply, so the
/// version precondition and the mutation are indivisible, mirroring what a
/// transaction gives the Postgres implementation.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let tables = self.lock()?;
        let mut products: Vec<Product> = tables.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.products.contains_key(&product.id) {
            return Err(StoreError::Conflict("product already exists".to_string()));
        }
        tables.products.insert(product.id, product);
        Ok(())
    }

    async fn update_product(
        &self,
        mut product: Product,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let stored = tables.products.get(&product.id).ok_or(StoreError::NotFound)?;
        if stored.version != expected_version {
            return Err(StoreError::Conflict(format!(
                "product version is {}, expected {}",
                stored.version, expected_version
            )));
        }
        product.version = expected_version + 1;
        tables.products.insert(product.id, product);
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if !tables.products.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if tables.requests.values().any(|r| r.product_id == id) {
            return Err(StoreError::Conflict(
                "product is referenced by withdrawal requests".to_string(),
            ));
        }
        tables.products.remove(&id);
        Ok(())
    }

    async fn request(&self, id: RequestId) -> Result<Option<WithdrawalRequest>, StoreError> {
        Ok(self.lock()?.requests.get(&id).cloned())
    }

    async fn list_requests(
        &self,
        state: Option<RequestState>,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let tables = self.lock()?;
        let mut requests: Vec<WithdrawalRequest> = tables
            .requests
            .values()
            .filter(|r| state.map_or(true, |s| r.state == s))
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn list_requests_for_user(
        &self,
        user_id: UserId,
        state: Option<RequestState>,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let mut requests = self.list_requests(state).await?;
        requests.retain(|r| r.user_id == user_id);
        Ok(requests)
    }

    async fn commit_submission(
        &self,
        mut product: Product,
        expected_version: u64,
        request: WithdrawalRequest,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;

        // Validate every precondition before mutating anything.
        let stored = tables.products.get(&product.id).ok_or(StoreError::NotFound)?;
        if stored.version != expected_version {
            return Err(StoreError::Conflict(format!(
                "product version is {}, expected {}",
                stored.version, expected_version
            )));
        }
        if tables.requests.contains_key(&request.id) {
            return Err(StoreError::Conflict("request already exists".to_string()));
        }

        product.version = expected_version + 1;
        tables.products.insert(product.id, product);
        tables.requests.insert(request.id, request);
        Ok(())
    }

    async fn commit_decision(
        &self,
        request: WithdrawalRequest,
        product_update: Option<(Product, u64)>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;

        let stored = tables.requests.get(&request.id).ok_or(StoreError::NotFound)?;
        if stored.state != RequestState::Pending {
            return Err(StoreError::Conflict(format!(
                "request is already {}",
                stored.state
            )));
        }

        if let Some((mut product, expected_version)) = product_update {
            let stored_product = tables
                .products
                .get(&product.id)
                .ok_or(StoreError::NotFound)?;
            if stored_product.version != expected_version {
                return Err(StoreError::Conflict(format!(
                    "product version is {}, expected {}",
                    stored_product.version, expected_version
                )));
            }
            product.version = expected_version + 1;
            tables.products.insert(product.id, product);
        }

        tables.requests.insert(request.id, request);
        Ok(())
    }

    async fn user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError> {
        let tables = self.lock()?;
        let mut users: Vec<UserAccount> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn upsert_user(&self, user: UserAccount) -> Result<(), StoreError> {
        self.lock()?.users.insert(user.id, user);
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        if self.lock()?.users.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn report_rows(&self) -> Result<Vec<ReportRow>, StoreError> {
        let tables = self.lock()?;
        let mut rows: Vec<ReportRow> = tables
            .requests
            .values()
            .map(|r| ReportRow {
                request_id: r.id,
                product_id: r.product_id,
                product_name: tables
                    .products
                    .get(&r.product_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                user_id: r.user_id,
                username: tables
                    .users
                    .get(&r.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                quantity: r.quantity,
                state: r.state,
                created_at: r.created_at,
                decided_at: r.decided_at,
            })
            .collect();
        rows.sort_by_key(|r| r.created_at);
        rows.reverse();
        Ok(rows)
    }
}

use std::sync::Arc;

use stockflow_infra::{Notifier, WithdrawalService, WorkflowStore};

/// Shared application services handed to handlers via an Extension layer.
pub struct AppServices {
    pub workflow: WithdrawalService,
}

impl AppServices {
    pub fn new(store: Arc<dyn WorkflowStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            workflow: WithdrawalService::new(store, notifier),
        }
    }
}

//! `stockflow-infra` — storage, notifications and the workflow service.
//!
//! The domain crates stay pure; this crate owns the transactional store
//! boundary (in-memory for tests/dev, Postgres for production), the
//! notification seam, and the `WithdrawalService` that composes them.

pub mod notify;
pub mod store;
pub mod workflow;


pub use notify::{LogNotifier, Notifier, NotifyError, Outcome, Receipt};
pub use store::{InMemoryStore, PostgresStore, ReportRow, StoreError, WorkflowStore};
pub use workflow::WithdrawalService;

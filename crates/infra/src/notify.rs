//! Notification seam for terminal request transitions.
//!
//! Delivery (SMTP, PDF receipts) is an external collaborator; this crate only
//! defines the contract and ships a tracing-backed implementation. Notifier
//! failures are logged by the caller and never affect a transition's result.

use async_trait::async_trait;
use thiserror::Error;

/// Outcome of an administrator's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Approved,
    Rejected,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Approved => "aprobada",
            Outcome::Rejected => "rechazada",
        }
    }
}

impl core::fmt::Display for Outcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the requester gets told about their request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub recipient: String,
    pub username: String,
    pub product_name: String,
    pub quantity: i64,
    pub outcome: Outcome,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, receipt: &Receipt) -> Result<(), NotifyError>;
}

/// Logs receipts instead of delivering them. Stands in for the mailer in
/// tests and in deployments without an SMTP relay.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, receipt: &Receipt) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %receipt.recipient,
            username = %receipt.username,
            product = %receipt.product_name,
            quantity = receipt.quantity,
            outcome = %receipt.outcome,
            "withdrawal receipt"
        );
        Ok(())
    }
}

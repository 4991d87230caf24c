use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{ProductId, RequestId, UserId, WorkflowError, WorkflowResult};

/// Lifecycle state of a withdrawal request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    /// Initial state; the requested quantity is already reserved.
    Pending,
    /// Terminal: the requester keeps the reserved stock.
    Approved,
    /// Terminal: the reserved stock was returned to the ledger.
    Rejected,
}

impl RequestState {
    /// Storage/wire representation (the schema predates this service).
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Pending => "pendiente",
            RequestState::Approved => "aprobada",
            RequestState::Rejected => "rechazada",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestState::Pending)
    }
}

impl core::fmt::Display for RequestState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestState {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(RequestState::Pending),
            "aprobada" => Ok(RequestState::Approved),
            "rechazada" => Ok(RequestState::Rejected),
            other => Err(WorkflowError::validation(format!(
                "unknown request state '{other}'"
            ))),
        }
    }
}

/// A user's ask to withdraw a quantity of a product, subject to approval.
///
/// # Invariants
/// - While `state == Pending`, `quantity` has already been subtracted from
///   the referenced product (reservation at submission, not at approval).
/// - No transition leaves a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: RequestId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub quantity: i64,
    pub state: RequestState,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl WithdrawalRequest {
    /// The only constructor: a freshly submitted, pending request.
    ///
    /// The caller must have reserved `quantity` on the product in the same
    /// logical transaction that persists this request.
    pub fn submit(
        id: RequestId,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Self> {
        if quantity <= 0 {
            return Err(WorkflowError::validation("quantity must be positive"));
        }
        Ok(Self {
            id,
            product_id,
            user_id,
            quantity,
            state: RequestState::Pending,
            created_at: now,
            decided_at: None,
        })
    }

    /// Pending → Approved. The reservation stands; no ledger effect.
    pub fn approve(&mut self, now: DateTime<Utc>) -> WorkflowResult<()> {
        self.transition(RequestState::Approved, now)
    }

    /// Pending → Rejected. The caller must return the reserved quantity to
    /// the ledger in the same logical transaction.
    pub fn reject(&mut self, now: DateTime<Utc>) -> WorkflowResult<()> {
        self.transition(RequestState::Rejected, now)
    }

    fn transition(&mut self, to: RequestState, now: DateTime<Utc>) -> WorkflowResult<()> {
        if self.state != RequestState::Pending {
            return Err(WorkflowError::invalid_state(format!(
                "request is already {}",
                self.state
            )));
        }
        self.state = to;
        self.decided_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_request() -> WithdrawalRequest {
        WithdrawalRequest::submit(
            RequestId::new(),
            UserId::new(),
            ProductId::new(),
            4,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn submit_starts_pending_with_no_decision() {
        let r = pending_request();
        assert_eq!(r.state, RequestState::Pending);
        assert!(r.decided_at.is_none());
    }

    #[test]
    fn submit_rejects_non_positive_quantity() {
        for qty in [0, -1] {
            let err = WithdrawalRequest::submit(
                RequestId::new(),
                UserId::new(),
                ProductId::new(),
                qty,
                Utc::now(),
            )
            .unwrap_err();
            assert!(matches!(err, WorkflowError::Validation(_)));
        }
    }

    #[test]
    fn approve_moves_pending_to_approved() {
        let mut r = pending_request();
        r.approve(Utc::now()).unwrap();
        assert_eq!(r.state, RequestState::Approved);
        assert!(r.decided_at.is_some());
    }

    #[test]
    fn reject_moves_pending_to_rejected() {
        let mut r = pending_request();
        r.reject(Utc::now()).unwrap();
        assert_eq!(r.state, RequestState::Rejected);
        assert!(r.decided_at.is_some());
    }

    #[test]
    fn no_transition_out_of_approved() {
        let mut r = pending_request();
        r.approve(Utc::now()).unwrap();

        let err = r.reject(Utc::now()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState(_)));
        assert_eq!(r.state, RequestState::Approved);

        let err = r.approve(Utc::now()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState(_)));
    }

    #[test]
    fn no_transition_out_of_rejected() {
        let mut r = pending_request();
        r.reject(Utc::now()).unwrap();

        assert!(matches!(
            r.approve(Utc::now()).unwrap_err(),
            WorkflowError::InvalidState(_)
        ));
        assert_eq!(r.state, RequestState::Rejected);
    }

    #[test]
    fn state_round_trips_through_storage_representation() {
        for state in [
            RequestState::Pending,
            RequestState::Approved,
            RequestState::Rejected,
        ] {
            assert_eq!(state.as_str().parse::<RequestState>().unwrap(), state);
        }
        assert!("cancelada".parse::<RequestState>().is_err());
    }
}

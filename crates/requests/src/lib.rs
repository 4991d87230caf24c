//! Withdrawal request state machine.
//!
//! A request is created `Pending` with its stock already reserved, then an
//! administrator moves it to `Approved` or `Rejected`. Terminal states are
//! final; requests form an append-only audit trail and are never deleted.

pub mod request;

pub use request::{RequestState, WithdrawalRequest};

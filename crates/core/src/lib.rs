//! `stockflow-core` — shared domain foundation.
//!
//! Strongly-typed identifiers and the workflow error taxonomy. This crate is
//! pure: no IO, no HTTP, no storage.

pub mod error;
pub mod id;

pub use error::{WorkflowError, WorkflowResult};
pub use id::{ProductId, RequestId, UserId};

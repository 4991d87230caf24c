//! `stockflow-api` — HTTP surface for the withdrawal workflow.

pub mod app;
pub mod authz;
pub mod middleware;
